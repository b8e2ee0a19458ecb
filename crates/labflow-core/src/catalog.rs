//! Restoration type catalog.
//!
//! The intake form offers these types grouped by kind. Free text is allowed;
//! [`RestorationCatalog::canonicalize`] snaps typo-level near-misses onto the
//! catalog spelling so reports group cleanly, and keeps anything else
//! verbatim. Longer free text that merely starts with a catalog type (for
//! example "Full Denture Upper") is not a typo and is kept as entered.

use serde::Serialize;
use strsim::{damerau_levenshtein, jaro_winkler};

/// Minimum Jaro-Winkler similarity for a fuzzy catalog match.
pub const FUZZY_MATCH_THRESHOLD: f64 = 0.92;

/// Most single-character edits a fuzzy match may need.
pub const MAX_TYPO_EDITS: usize = 2;

/// A named group of restoration types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RestorationGroup {
    pub name: &'static str,
    pub types: &'static [&'static str],
}

/// Catalog shipped with the lab.
pub const RESTORATION_GROUPS: &[RestorationGroup] = &[
    RestorationGroup {
        name: "Crowns",
        types: &[
            "PFM Crown",
            "Zirconia Crown",
            "E.max Crown",
            "Full-Cast Gold Crown",
            "Porcelain Crown",
            "Provisional/Temporary Crown",
        ],
    },
    RestorationGroup {
        name: "Bridges",
        types: &[
            "PFM Bridge",
            "Zirconia Bridge",
            "E.max Bridge",
            "Maryland Bridge",
            "Provisional/Temporary Bridge",
        ],
    },
    RestorationGroup {
        name: "Implants",
        types: &[
            "Implant Crown",
            "Custom Abutment",
            "Screw-Retained Crown",
            "Implant Bridge",
            "All-on-4 Final",
            "All-on-6 Final",
            "Implant Overdenture",
            "Hybrid Denture",
        ],
    },
    RestorationGroup {
        name: "Veneers & Inlays/Onlays",
        types: &[
            "E.max Veneer",
            "E.max Veneer Set",
            "Zirconia Veneer",
            "Porcelain Inlay",
            "Porcelain Onlay",
            "Gold Inlay",
            "Gold Onlay",
        ],
    },
    RestorationGroup {
        name: "Removables",
        types: &[
            "Full Denture",
            "Partial Denture",
            "Immediate Denture",
            "Flipper",
            "Overdenture",
        ],
    },
    RestorationGroup {
        name: "Appliances",
        types: &[
            "Night Guard",
            "Occlusal Splint",
            "Surgical Guide",
            "Bleaching Tray",
            "Orthodontic Retainer",
            "Sports Mouthguard",
            "Sleep Apnea Appliance",
        ],
    },
    RestorationGroup {
        name: "Other",
        types: &["Wax Try-In", "Diagnostic Wax-Up", "Post and Core", "Other"],
    },
];

/// How an input was resolved against the catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogMatch {
    /// Same spelling apart from case and surrounding whitespace
    Exact(&'static str),
    /// Close enough to a catalog entry
    Fuzzy { name: &'static str, score: f64 },
    /// Not in the catalog; kept as entered
    Unknown(String),
}

impl CatalogMatch {
    /// The value to store.
    pub fn value(&self) -> &str {
        match self {
            CatalogMatch::Exact(name) | CatalogMatch::Fuzzy { name, .. } => name,
            CatalogMatch::Unknown(raw) => raw.as_str(),
        }
    }
}

/// Lookup over [`RESTORATION_GROUPS`].
#[derive(Debug, Clone, Copy)]
pub struct RestorationCatalog {
    groups: &'static [RestorationGroup],
    threshold: f64,
}

impl Default for RestorationCatalog {
    fn default() -> Self {
        Self {
            groups: RESTORATION_GROUPS,
            threshold: FUZZY_MATCH_THRESHOLD,
        }
    }
}

impl RestorationCatalog {
    pub fn groups(&self) -> &'static [RestorationGroup] {
        self.groups
    }

    /// Every catalog type in display order.
    pub fn all_types(&self) -> impl Iterator<Item = &'static str> {
        self.groups.iter().flat_map(|g| g.types.iter().copied())
    }

    /// Group a catalog type belongs to.
    pub fn group_of(&self, restoration_type: &str) -> Option<&'static str> {
        let wanted = restoration_type.trim();
        self.groups
            .iter()
            .find(|g| g.types.iter().any(|t| t.eq_ignore_ascii_case(wanted)))
            .map(|g| g.name)
    }

    /// Resolve free text to a catalog spelling where possible.
    pub fn resolve(&self, input: &str) -> CatalogMatch {
        let trimmed = input.trim();
        if let Some(name) = self.all_types().find(|t| t.eq_ignore_ascii_case(trimmed)) {
            return CatalogMatch::Exact(name);
        }

        let lowered = trimmed.to_lowercase();
        let best = self
            .all_types()
            .filter(|t| damerau_levenshtein(&lowered, &t.to_lowercase()) <= MAX_TYPO_EDITS)
            .map(|t| (t, jaro_winkler(&lowered, &t.to_lowercase())))
            .max_by(|a, b| a.1.total_cmp(&b.1));

        match best {
            Some((name, score)) if score >= self.threshold => {
                tracing::debug!(input = trimmed, matched = name, score, "Fuzzy restoration type match");
                CatalogMatch::Fuzzy { name, score }
            }
            _ => CatalogMatch::Unknown(trimmed.to_string()),
        }
    }

    /// Stored spelling for a restoration type.
    pub fn canonicalize(&self, input: &str) -> String {
        self.resolve(input).value().to_string()
    }
}
