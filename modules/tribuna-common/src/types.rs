use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Candidate ---

/// A candidate record as seen by the pipeline. Owned and mutated by the
/// CRUD layer; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub id: Uuid,
    pub display_name: String,
    pub office: String,
    pub region: String,
    pub ballot_number: Option<u32>,
    pub biography: Option<String>,
    pub proposals: Option<String>,
}

// --- Source articles ---

/// One headline picked by the arbiter. Fetched per invocation, never
/// persisted by this subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceArticle {
    pub title: String,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
    /// ISO 3166-1 alpha-2, lowercase, when the provider reports one.
    pub source_country: Option<String>,
}

// --- Generated drafts ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Blog,
    Social,
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentKind::Blog => write!(f, "blog"),
            ContentKind::Social => write!(f, "social"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    Draft,
    Approved,
    Edited,
    Published,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageResult {
    pub url: String,
    pub title: Option<String>,
    pub license: Option<String>,
}

/// Everything about a draft that isn't the body: provenance, media,
/// per-network variants, SEO keywords.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DraftMetadata {
    pub source_url: Option<String>,
    pub image: Option<ImageResult>,
    #[serde(default)]
    pub variants: BTreeMap<SocialNetwork, String>,
    pub canonical: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedDraft {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub kind: ContentKind,
    pub body: String,
    pub metadata: DraftMetadata,
    pub created_at: DateTime<Utc>,
    pub status: DraftStatus,
    /// Set by the publish step once the external hook reports a post id.
    pub published_post_id: Option<String>,
}

// --- Social destinations ---

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SocialNetwork {
    Twitter,
    Facebook,
    Instagram,
    Linkedin,
    Whatsapp,
    Telegram,
}

impl SocialNetwork {
    pub const ALL: [SocialNetwork; 6] = [
        SocialNetwork::Twitter,
        SocialNetwork::Facebook,
        SocialNetwork::Instagram,
        SocialNetwork::Linkedin,
        SocialNetwork::Whatsapp,
        SocialNetwork::Telegram,
    ];
}

impl std::fmt::Display for SocialNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SocialNetwork::Twitter => write!(f, "twitter"),
            SocialNetwork::Facebook => write!(f, "facebook"),
            SocialNetwork::Instagram => write!(f, "instagram"),
            SocialNetwork::Linkedin => write!(f, "linkedin"),
            SocialNetwork::Whatsapp => write!(f, "whatsapp"),
            SocialNetwork::Telegram => write!(f, "telegram"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    Pending,
    Approved,
    Expired,
    Revoked,
}

impl std::fmt::Display for AuthorizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthorizationStatus::Pending => write!(f, "pending"),
            AuthorizationStatus::Approved => write!(f, "approved"),
            AuthorizationStatus::Expired => write!(f, "expired"),
            AuthorizationStatus::Revoked => write!(f, "revoked"),
        }
    }
}

/// One external account/page for one candidate on one network.
///
/// Invariants: `Approved` implies `authorized_at` is set, `Revoked` implies
/// `revoked_at` is set, and `active == false` disqualifies the destination
/// as a publish target regardless of status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialDestination {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub network: SocialNetwork,
    pub profile_url: String,
    pub owner_name: String,
    pub owner_phone: Option<String>,
    pub owner_email: Option<String>,
    pub active: bool,
    pub authorization_status: AuthorizationStatus,
    pub last_invite_sent_at: Option<DateTime<Utc>>,
    pub authorized_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl SocialDestination {
    /// Whether the destination may receive generated content right now.
    /// `active` is an independent gate; status alone is never trusted.
    pub fn is_eligible(&self) -> bool {
        self.active && self.authorization_status == AuthorizationStatus::Approved
    }
}

// --- Authorization invites ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteDecision {
    Approved,
    Declined,
}

/// Single-use consent credential for one destination. Stores only the
/// SHA-256 hash of the token; the plaintext exists only in the outbound
/// consent link. Invites are superseded, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationInvite {
    pub id: Uuid,
    pub destination_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub decision: Option<InviteDecision>,
    pub created_at: DateTime<Utc>,
}

impl AuthorizationInvite {
    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
