use serde::Serialize;

/// A hospital unit that is expected to submit a daily report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Hospital {
    pub id: &'static str,
    pub name: &'static str,
}

/// A checklist category and its mandatory items. Every category also carries one
/// free-text "other" slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChecklistCategory {
    pub name: &'static str,
    pub items: &'static [&'static str],
}

pub const HOSPITALS: &[Hospital] = &[
    Hospital {
        id: "gineco3a",
        name: "Gineco 3A",
    },
    Hospital {
        id: "hgz24",
        name: "HGZ24",
    },
    Hospital {
        id: "hgz27",
        name: "HGZ27",
    },
    Hospital {
        id: "hgz29",
        name: "HGZ29",
    },
    Hospital {
        id: "hgz48",
        name: "HGZ48",
    },
];

pub const CHECKLIST: &[ChecklistCategory] = &[
    ChecklistCategory {
        name: "Conservación",
        items: &[
            "maquina de anestesia",
            "aire acondicionado",
            "agua",
            "limpieza",
        ],
    },
    ChecklistCategory {
        name: "Personal",
        items: &["vacaciones", "ausentismo"],
    },
    ChecklistCategory {
        name: "Finanzas",
        items: &["pagos a proveedores", "facturas pendientes"],
    },
    ChecklistCategory {
        name: "Abasto",
        items: &["kits", "medicamentos"],
    },
    ChecklistCategory {
        name: "Tics",
        items: &["red", "sistema", "impresora", "equipo dañado"],
    },
];

pub const OPERATIONS_PER_DAY: i64 = 7;
pub const OPERATIONS_PER_FORTNIGHT: i64 = 112;
pub const OPERATIONS_PER_WEEK: i64 = OPERATIONS_PER_FORTNIGHT / 2;

/// Highest operations count a unit may report for a single day.
pub const MAX_OPERATIONS_PER_DAY: i64 = OPERATIONS_PER_DAY;

pub const OTHER_CHECKBOX_SUFFIX: &str = "_otro_checkbox";
pub const OTHER_TEXT_SUFFIX: &str = "_otro_text";

// Matched case-insensitively against report observations when looking for
// recurring problems.
pub const OBSERVATION_KEYWORDS: &[&str] = &[
    "falla de red",
    "falta de personal",
    "maquina dañada",
    "agua",
    "aire acondicionado",
    "limpieza",
    "vacaciones",
    "ausentismo",
    "pagos",
    "facturas",
    "kits",
    "medicamentos",
    "sistema",
    "impresora",
    "equipo dañado",
];

pub fn hospital_by_id(id: &str) -> Option<&'static Hospital> {
    HOSPITALS.iter().find(|h| h.id == id)
}

/// Display name for a hospital id, falling back to the id itself for units that are
/// no longer on the roster.
pub fn hospital_name(id: &str) -> String {
    hospital_by_id(id)
        .map(|h| h.name.to_string())
        .unwrap_or_else(|| id.to_string())
}

pub fn other_checkbox_key(category: &str) -> String {
    format!("{}{}", category, OTHER_CHECKBOX_SUFFIX)
}

pub fn other_text_key(category: &str) -> String {
    format!("{}{}", category, OTHER_TEXT_SUFFIX)
}
