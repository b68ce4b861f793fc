use std::sync::Arc;

use chrono::Duration;
use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::info;

use tribuna_common::{
    AuthorizationInvite, AuthorizationStatus, CandidateProfile, Clock, InviteDecision,
    SocialDestination, TribunaError,
};
use uuid::Uuid;

use crate::store::DestinationStore;

/// Invite lifetime. Short enough that lazy expiry on read is sufficient;
/// no background sweeper needed.
const INVITE_TTL_HOURS: i64 = 5;

/// Entropy of the plaintext token, in bytes.
const TOKEN_BYTES: usize = 32;

const MESSAGING_DOMAIN: &str = "wa.me";

/// Everything produced by issuing an invite. The plaintext token appears
/// only inside `consent_link`, `message` and `deep_link` — never in logs
/// and never in the store.
#[derive(Debug, Clone)]
pub struct IssuedInvite {
    pub invite: AuthorizationInvite,
    pub consent_link: String,
    pub message: String,
    pub deep_link: String,
}

/// Owns the destination lifecycle (`pending → approved/expired`,
/// `{pending,approved} → revoked`) and the single-use invite tokens that
/// gate it. Nothing leaves `revoked` except a brand-new invite.
pub struct AuthorizationService {
    store: Arc<dyn DestinationStore>,
    clock: Arc<dyn Clock>,
    site_base_url: String,
    phone_country_prefix: String,
}

impl AuthorizationService {
    pub fn new(
        store: Arc<dyn DestinationStore>,
        clock: Arc<dyn Clock>,
        site_base_url: &str,
        phone_country_prefix: &str,
    ) -> Self {
        Self {
            store,
            clock,
            site_base_url: site_base_url.trim_end_matches('/').to_string(),
            phone_country_prefix: phone_country_prefix.to_string(),
        }
    }

    /// Issue a fresh invite for a destination. Resets the destination to
    /// `pending`, clears any prior revocation, and builds the messaging
    /// deep link the owner must act on — consent is never auto-approved.
    /// Only a revocation's deactivation is undone here; a destination an
    /// operator switched off for other reasons stays inactive until the
    /// operator flips it back. A newer invite supersedes an older unused
    /// one; both remain queryable for audit.
    pub async fn issue_invite(
        &self,
        candidate: &CandidateProfile,
        destination_id: Uuid,
    ) -> Result<IssuedInvite, TribunaError> {
        let mut destination = self
            .store
            .destination(destination_id)
            .await
            .map_err(|e| TribunaError::Store(e.to_string()))?
            .ok_or(TribunaError::DestinationNotEligible)?;

        let phone = destination
            .owner_phone
            .clone()
            .filter(|p| p.chars().any(|c| c.is_ascii_digit()))
            .ok_or(TribunaError::DestinationNotEligible)?;

        let now = self.clock.now();
        let token = generate_token();

        let invite = AuthorizationInvite {
            id: Uuid::new_v4(),
            destination_id,
            token_hash: hash_token(&token),
            expires_at: now + Duration::hours(INVITE_TTL_HOURS),
            used_at: None,
            decision: None,
            created_at: now,
        };
        self.store
            .insert_invite(&invite)
            .await
            .map_err(|e| TribunaError::Store(e.to_string()))?;

        if destination.authorization_status == AuthorizationStatus::Revoked {
            destination.active = true;
        }
        destination.authorization_status = AuthorizationStatus::Pending;
        destination.last_invite_sent_at = Some(now);
        destination.revoked_at = None;
        self.store
            .update_destination(&destination)
            .await
            .map_err(|e| TribunaError::Store(e.to_string()))?;

        let consent_link = format!("{}/consent?token={}", self.site_base_url, token);
        let message = consent_message(candidate, &destination, &consent_link);
        let deep_link = format!(
            "https://{}/{}?text={}",
            MESSAGING_DOMAIN,
            normalize_phone(&phone, &self.phone_country_prefix),
            urlencoding::encode(&message)
        );

        info!(
            destination = %destination_id,
            network = %destination.network,
            expires_at = %invite.expires_at,
            "Invite issued"
        );

        Ok(IssuedInvite {
            invite,
            consent_link,
            message,
            deep_link,
        })
    }

    /// Consume a presented plaintext token with the owner's decision.
    /// Approval drives the destination to `approved`; a decline is recorded
    /// but never silently becomes approval — the destination stays
    /// `pending` for an explicit re-invite.
    pub async fn consume_invite(
        &self,
        token: &str,
        decision: InviteDecision,
    ) -> Result<SocialDestination, TribunaError> {
        let invite = self
            .store
            .find_invite_by_hash(&hash_token(token))
            .await
            .map_err(|e| TribunaError::Store(e.to_string()))?
            .ok_or(TribunaError::InviteNotFound)?;

        if invite.is_used() {
            return Err(TribunaError::InviteAlreadyUsed);
        }

        let now = self.clock.now();
        let mut destination = self
            .store
            .destination(invite.destination_id)
            .await
            .map_err(|e| TribunaError::Store(e.to_string()))?
            .ok_or(TribunaError::InviteNotFound)?;

        if invite.is_expired(now) {
            if destination.authorization_status == AuthorizationStatus::Pending {
                destination.authorization_status = AuthorizationStatus::Expired;
                self.store
                    .update_destination(&destination)
                    .await
                    .map_err(|e| TribunaError::Store(e.to_string()))?;
            }
            return Err(TribunaError::InviteExpired);
        }

        self.store
            .mark_invite_used(invite.id, now, decision)
            .await
            .map_err(|e| TribunaError::Store(e.to_string()))?;

        if decision == InviteDecision::Approved {
            destination.authorization_status = AuthorizationStatus::Approved;
            destination.authorized_at = Some(now);
            self.store
                .update_destination(&destination)
                .await
                .map_err(|e| TribunaError::Store(e.to_string()))?;
        }

        info!(
            destination = %destination.id,
            decision = ?decision,
            "Invite consumed"
        );

        Ok(destination)
    }

    /// List a candidate's destinations, lazily flipping any `pending`
    /// destination whose latest invite is unused and past expiry to
    /// `expired`. Expiry is computed at read time, not polled.
    pub async fn list_destinations(
        &self,
        candidate_id: Uuid,
    ) -> Result<Vec<SocialDestination>, TribunaError> {
        let destinations = self
            .store
            .destinations_for_candidate(candidate_id)
            .await
            .map_err(|e| TribunaError::Store(e.to_string()))?;

        let now = self.clock.now();
        let mut swept = Vec::with_capacity(destinations.len());

        for mut destination in destinations {
            if destination.authorization_status == AuthorizationStatus::Pending {
                let latest = self
                    .store
                    .latest_invite(destination.id)
                    .await
                    .map_err(|e| TribunaError::Store(e.to_string()))?;
                if let Some(invite) = latest {
                    if !invite.is_used() && invite.is_expired(now) {
                        destination.authorization_status = AuthorizationStatus::Expired;
                        self.store
                            .update_destination(&destination)
                            .await
                            .map_err(|e| TribunaError::Store(e.to_string()))?;
                    }
                }
            }
            swept.push(destination);
        }

        Ok(swept)
    }

    /// Revoke a destination. Idempotent: re-revoking keeps the earliest
    /// `revoked_at` and stays `revoked`.
    pub async fn revoke(&self, destination_id: Uuid) -> Result<SocialDestination, TribunaError> {
        let mut destination = self
            .store
            .destination(destination_id)
            .await
            .map_err(|e| TribunaError::Store(e.to_string()))?
            .ok_or(TribunaError::DestinationNotEligible)?;

        destination.active = false;
        destination.authorization_status = AuthorizationStatus::Revoked;
        if destination.revoked_at.is_none() {
            destination.revoked_at = Some(self.clock.now());
        }
        self.store
            .update_destination(&destination)
            .await
            .map_err(|e| TribunaError::Store(e.to_string()))?;

        info!(destination = %destination_id, "Destination revoked");
        Ok(destination)
    }
}

fn generate_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::rng().random();
    hex::encode(bytes)
}

/// SHA-256 hex of the plaintext token. Only this ever reaches the store.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn consent_message(
    candidate: &CandidateProfile,
    destination: &SocialDestination,
    consent_link: &str,
) -> String {
    let who = match candidate.ballot_number {
        Some(number) => format!("{} (tarjetón {})", candidate.display_name, number),
        None => candidate.display_name.clone(),
    };
    format!(
        "Hola {}: la campaña de {} solicita tu autorización para publicar \
         contenido en la cuenta de {} ({}). Para decidir, abre este enlace: {}",
        destination.owner_name, who, destination.network, destination.profile_url, consent_link
    )
}

/// Normalize a contact phone for the messaging deep link: digits only, a
/// leading `00` is an international prefix, and a bare 10-digit number is a
/// domestic mobile that needs the country prefix.
pub fn normalize_phone(raw: &str, country_prefix: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if let Some(rest) = digits.strip_prefix("00") {
        return rest.to_string();
    }
    if digits.len() == 10 {
        return format!("{country_prefix}{digits}");
    }
    digits
}

/// Constant-time byte comparison for in-process secret checks (presented
/// bearer credentials vs configured secrets). Hash lookups in the store do
/// not need this; they are index operations over non-secret digests.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
