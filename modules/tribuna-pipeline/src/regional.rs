/// Static knowledge of which outlets and URL fragments count as "local"
/// for an office/region pair. Pure lookup, no I/O.

/// Regional bias applied during source arbitration.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionBias {
    /// ISO 3166-1 alpha-2, lowercase. `None` means no country preference.
    pub country: Option<&'static str>,
    pub language: Option<&'static str>,
    /// Outlet names usable as query terms.
    pub outlets: &'static [&'static str],
    /// URL substrings that identify a local outlet.
    pub url_fragments: &'static [&'static str],
    /// National races ignore the region's local outlets.
    pub national: bool,
}

/// Offices elected by the whole country rather than one region.
const NATIONAL_OFFICES: &[&str] = &["senado", "senate", "presidencia", "president"];

struct RegionEntry {
    region: &'static str,
    outlets: &'static [&'static str],
    url_fragments: &'static [&'static str],
}

/// Compile-time outlet table. Keyed by normalized region name.
const REGIONS: &[RegionEntry] = &[
    RegionEntry {
        region: "bogota",
        outlets: &["El Tiempo", "El Espectador", "Semana"],
        url_fragments: &["eltiempo.com", "elespectador.com", "semana.com"],
    },
    RegionEntry {
        region: "antioquia",
        outlets: &["El Colombiano", "Minuto30"],
        url_fragments: &["elcolombiano.com", "minuto30.com"],
    },
    RegionEntry {
        region: "valle del cauca",
        outlets: &["El País Cali", "90 Minutos"],
        url_fragments: &["elpais.com.co", "90minutos.co"],
    },
    RegionEntry {
        region: "atlantico",
        outlets: &["El Heraldo", "Zona Cero"],
        url_fragments: &["elheraldo.co", "zonacero.com"],
    },
    RegionEntry {
        region: "santander",
        outlets: &["Vanguardia"],
        url_fragments: &["vanguardia.com"],
    },
    RegionEntry {
        region: "bolivar",
        outlets: &["El Universal"],
        url_fragments: &["eluniversal.com.co"],
    },
];

/// National wires consulted when no regional outlet applies.
const NATIONAL_OUTLETS: &[&str] = &["El Tiempo", "El Espectador", "Semana", "La Silla Vacía"];
const NATIONAL_FRAGMENTS: &[&str] = &[
    "eltiempo.com",
    "elespectador.com",
    "semana.com",
    "lasillavacia.com",
];

const DEFAULT_COUNTRY: &str = "co";
const DEFAULT_LANGUAGE: &str = "es";

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Derive the bias for a candidate's office and region. A senate-equivalent
/// office forces the national bias regardless of region.
pub fn region_bias(office: &str, region: &str) -> RegionBias {
    let office_norm = normalize(office);
    let national = NATIONAL_OFFICES.iter().any(|o| office_norm.contains(o));

    if !national {
        let region_norm = normalize(region);
        if let Some(entry) = REGIONS.iter().find(|e| e.region == region_norm) {
            return RegionBias {
                country: Some(DEFAULT_COUNTRY),
                language: Some(DEFAULT_LANGUAGE),
                outlets: entry.outlets,
                url_fragments: entry.url_fragments,
                national: false,
            };
        }
    }

    RegionBias {
        country: Some(DEFAULT_COUNTRY),
        language: Some(DEFAULT_LANGUAGE),
        outlets: NATIONAL_OUTLETS,
        url_fragments: NATIONAL_FRAGMENTS,
        national: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_region_gets_local_outlets() {
        let bias = region_bias("Concejo Municipal", "Antioquia");
        assert!(!bias.national);
        assert!(bias.url_fragments.contains(&"elcolombiano.com"));
        assert_eq!(bias.country, Some("co"));
    }

    #[test]
    fn senate_office_forces_national_bias() {
        let bias = region_bias("Senado de la República", "Antioquia");
        assert!(bias.national);
        assert!(bias.url_fragments.contains(&"eltiempo.com"));
    }

    #[test]
    fn unknown_region_falls_back_to_national() {
        let bias = region_bias("Alcaldía", "Narnia");
        assert!(bias.national);
        assert_eq!(bias.language, Some("es"));
    }
}
