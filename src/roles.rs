use serde::Serialize;
use tracing::warn;

use crate::metrics::Metric;

/// Positional grouping driving weight selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Role {
    #[serde(rename = "FRONT_5")]
    Front5,
    #[serde(rename = "BACK_ROW")]
    BackRow,
    #[serde(rename = "HALF_BACKS")]
    HalfBacks,
    #[serde(rename = "BACKS")]
    Backs,
}

impl Role {
    pub fn name(self) -> &'static str {
        match self {
            Role::Front5 => "FRONT_5",
            Role::BackRow => "BACK_ROW",
            Role::HalfBacks => "HALF_BACKS",
            Role::Backs => "BACKS",
        }
    }
}

/// Blend weights over the three sub-scores.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BlendWeights {
    pub unstructured: f64,
    pub defensive: f64,
    pub discipline: f64,
}

/// Immutable weight configuration for one role. Negative weights are
/// penalties (missed tackles, cards).
#[derive(Debug, Clone, Copy)]
pub struct RoleProfile {
    pub unstructured: &'static [(Metric, f64)],
    pub defensive: &'static [(Metric, f64)],
    pub discipline: &'static [(Metric, f64)],
    pub blend: BlendWeights,
}

pub static FRONT_5: RoleProfile = RoleProfile {
    unstructured: &[
        (Metric::Carries, 0.25),
        (Metric::MetresMade, 0.10),
        (Metric::Offloads, 0.10),
        (Metric::CleanBreaks, 0.10),
        (Metric::DefendersBeaten, 0.10),
    ],
    defensive: &[
        (Metric::Tackles, 0.45),
        (Metric::TackleSuccessPct, 0.30),
        (Metric::MissedTackles, -0.15),
        (Metric::TurnoversWon, 0.10),
    ],
    // Front-row penalties are disproportionately costly (scrum infringements).
    discipline: &[
        (Metric::PenaltiesConceded, -0.80),
        (Metric::YellowCards, -2.0),
        (Metric::RedCards, -5.0),
    ],
    blend: BlendWeights {
        unstructured: 0.30,
        defensive: 0.50,
        discipline: 0.20,
    },
};

pub static BACK_ROW: RoleProfile = RoleProfile {
    unstructured: &[
        (Metric::Carries, 0.30),
        (Metric::MetresMade, 0.15),
        (Metric::Offloads, 0.15),
        (Metric::CleanBreaks, 0.15),
        (Metric::DefendersBeaten, 0.15),
    ],
    defensive: &[
        (Metric::Tackles, 0.40),
        (Metric::TackleSuccessPct, 0.30),
        (Metric::MissedTackles, -0.15),
        (Metric::TurnoversWon, 0.15),
    ],
    discipline: &[
        (Metric::PenaltiesConceded, -0.50),
        (Metric::YellowCards, -2.0),
        (Metric::RedCards, -5.0),
    ],
    blend: BlendWeights {
        unstructured: 0.40,
        defensive: 0.40,
        discipline: 0.20,
    },
};

pub static HALF_BACKS: RoleProfile = RoleProfile {
    unstructured: &[
        (Metric::Carries, 0.15),
        (Metric::MetresMade, 0.15),
        (Metric::Offloads, 0.25),
        (Metric::CleanBreaks, 0.20),
        (Metric::DefendersBeaten, 0.25),
    ],
    defensive: &[
        (Metric::Tackles, 0.35),
        (Metric::TackleSuccessPct, 0.35),
        (Metric::MissedTackles, -0.15),
        (Metric::TurnoversWon, 0.15),
    ],
    discipline: &[
        (Metric::PenaltiesConceded, -0.50),
        (Metric::YellowCards, -2.0),
        (Metric::RedCards, -5.0),
    ],
    blend: BlendWeights {
        unstructured: 0.45,
        defensive: 0.35,
        discipline: 0.20,
    },
};

pub static BACKS: RoleProfile = RoleProfile {
    unstructured: &[
        (Metric::Carries, 0.20),
        (Metric::MetresMade, 0.30),
        (Metric::Offloads, 0.15),
        (Metric::CleanBreaks, 0.18),
        (Metric::DefendersBeaten, 0.17),
    ],
    defensive: &[
        (Metric::Tackles, 0.30),
        (Metric::TackleSuccessPct, 0.35),
        (Metric::MissedTackles, -0.20),
        (Metric::TurnoversWon, 0.10),
    ],
    // Outside backs concede fewer structural penalties; cost them less.
    discipline: &[
        (Metric::PenaltiesConceded, -0.30),
        (Metric::YellowCards, -2.0),
        (Metric::RedCards, -5.0),
    ],
    blend: BlendWeights {
        unstructured: 0.50,
        defensive: 0.30,
        discipline: 0.20,
    },
};

/// Role-agnostic default tables, used when no role context should apply.
pub static DEFAULTS: RoleProfile = RoleProfile {
    unstructured: &[
        (Metric::Carries, 0.20),
        (Metric::MetresMade, 0.25),
        (Metric::Offloads, 0.15),
        (Metric::CleanBreaks, 0.20),
        (Metric::DefendersBeaten, 0.20),
    ],
    defensive: &[
        (Metric::Tackles, 0.40),
        (Metric::TackleSuccessPct, 0.35),
        (Metric::MissedTackles, -0.15),
        (Metric::TurnoversWon, 0.10),
    ],
    discipline: &[
        (Metric::PenaltiesConceded, -0.50),
        (Metric::YellowCards, -2.0),
        (Metric::RedCards, -5.0),
    ],
    blend: BlendWeights {
        unstructured: 0.40,
        defensive: 0.40,
        discipline: 0.20,
    },
};

impl Role {
    pub fn profile(self) -> &'static RoleProfile {
        match self {
            Role::Front5 => &FRONT_5,
            Role::BackRow => &BACK_ROW,
            Role::HalfBacks => &HALF_BACKS,
            Role::Backs => &BACKS,
        }
    }
}

/// Which weight tables to use when no role could be resolved. `BackRow`
/// mirrors the long-standing behavior of treating unknown players as
/// back-rowers; `Defaults` uses the role-agnostic tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoleFallback {
    #[default]
    BackRow,
    Defaults,
}

pub fn profile_for(role: Option<Role>, fallback: RoleFallback) -> &'static RoleProfile {
    match role {
        Some(role) => role.profile(),
        None => {
            warn!(?fallback, "no role resolved, using fallback weights");
            match fallback {
                RoleFallback::BackRow => &BACK_ROW,
                RoleFallback::Defaults => &DEFAULTS,
            }
        }
    }
}

fn role_from_jersey(number: u8) -> Option<Role> {
    match number {
        1..=5 => Some(Role::Front5),
        6..=8 => Some(Role::BackRow),
        9..=10 => Some(Role::HalfBacks),
        11..=15 => Some(Role::Backs),
        _ => None,
    }
}

/// Classify a free-form position string (jersey number, positional name, or a
/// role name itself) into a role. Returns `None` rather than guessing.
pub fn role_from_position(position: Option<&str>) -> Option<Role> {
    let raw = position?.trim();
    if raw.is_empty() {
        return None;
    }

    let mut text = raw.to_lowercase();
    // "No. 8" / "No 8" style prefixes.
    if let Some(rest) = text.strip_prefix("no.") {
        text = rest.trim().to_string();
    } else if let Some(rest) = text.strip_prefix("no ") {
        text = rest.trim().to_string();
    }

    // Exact jersey number.
    if let Ok(number) = text.parse::<u8>() {
        if let Some(role) = role_from_jersey(number) {
            return Some(role);
        }
    }

    // Role name passed through directly.
    for role in [Role::Front5, Role::BackRow, Role::HalfBacks, Role::Backs] {
        if text.eq_ignore_ascii_case(role.name()) {
            return Some(role);
        }
    }

    // Positional-name fragments, checked in fixed order.
    if ["front", "prop", "hook", "lock"].iter().any(|f| text.contains(f)) {
        return Some(Role::Front5);
    }
    if ["back_row", "flanker", "number", "openside", "blindside", "8"]
        .iter()
        .any(|f| text.contains(f))
    {
        return Some(Role::BackRow);
    }
    if ["half", "scrum", "fly", "9", "10"].iter().any(|f| text.contains(f)) {
        return Some(Role::HalfBacks);
    }
    if ["back", "wing", "centre", "full", "11", "12", "13", "14", "15"]
        .iter()
        .any(|f| text.contains(f))
    {
        return Some(Role::Backs);
    }

    warn!(position = raw, "could not determine role from position");
    None
}
