//! Order classification taxonomy.
//!
//! One closed set of order types shared by the validator, the extraction
//! prompt and the HTTP surface. Index categories carry a finite list of
//! sub-types; the flat kinds (as emitted by the extraction model) carry none.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderType {
    /// Қ: staffing orders.
    Personnel,
    /// ЖҚ: orders on personal matters.
    PersonalAffairs,
    /// Ө: operational orders.
    Operational,
    Leave,
    Hiring,
    Dismissal,
    BusinessTrip,
    CoreActivity,
}

const PERSONNEL_SUB_TYPES: &[&str] = &[
    "Прием на работу",
    "Увольнение (расторжение ТД)",
    "Перевод на другую должность",
    "Изменение оклада",
    "Совмещение должностей",
];

const PERSONAL_AFFAIRS_SUB_TYPES: &[&str] = &[
    "Ежегодный трудовой отпуск",
    "Отпуск без сохранения з/п",
    "Отпуск по беременности/уходу",
    "Командировка",
    "Премирование",
    "Материальная помощь",
    "Дисциплинарное взыскание",
];

const OPERATIONAL_SUB_TYPES: &[&str] = &[
    "Основная деятельность",
    "Создание комиссии",
    "Утверждение графиков/инструкций",
    "Проведение инвентаризации",
    "Возложение обязанностей",
];

impl OrderType {
    /// Every order type, index categories first.
    pub fn all() -> &'static [OrderType] {
        &[
            OrderType::Personnel,
            OrderType::PersonalAffairs,
            OrderType::Operational,
            OrderType::Leave,
            OrderType::Hiring,
            OrderType::Dismissal,
            OrderType::BusinessTrip,
            OrderType::CoreActivity,
        ]
    }

    /// The flat kinds offered to the extraction model.
    pub fn extraction_kinds() -> &'static [OrderType] {
        &[
            OrderType::Leave,
            OrderType::Hiring,
            OrderType::Dismissal,
            OrderType::BusinessTrip,
            OrderType::CoreActivity,
        ]
    }

    /// Human label, as stored in the `type` column.
    pub fn label(&self) -> &'static str {
        match self {
            OrderType::Personnel => "Қ - Кадровые",
            OrderType::PersonalAffairs => "ЖҚ - Личный состав",
            OrderType::Operational => "Ө - Производственные",
            OrderType::Leave => "Отпуск",
            OrderType::Hiring => "Прием на работу",
            OrderType::Dismissal => "Увольнение",
            OrderType::BusinessTrip => "Командировка",
            OrderType::CoreActivity => "Основная деятельность",
        }
    }

    pub fn sub_types(&self) -> &'static [&'static str] {
        match self {
            OrderType::Personnel => PERSONNEL_SUB_TYPES,
            OrderType::PersonalAffairs => PERSONAL_AFFAIRS_SUB_TYPES,
            OrderType::Operational => OPERATIONAL_SUB_TYPES,
            _ => &[],
        }
    }

    pub fn allows_sub_type(&self, sub_type: &str) -> bool {
        let sub_type = sub_type.trim();
        self.sub_types()
            .iter()
            .any(|s| s.to_lowercase() == sub_type.to_lowercase())
    }

    /// Canonical spelling of a sub-type belonging to this type.
    pub fn canonical_sub_type(&self, sub_type: &str) -> Option<&'static str> {
        let wanted = sub_type.trim().to_lowercase();
        self.sub_types()
            .iter()
            .copied()
            .find(|s| s.to_lowercase() == wanted)
    }

    /// Parses a label. Surrounding whitespace and letter case are ignored.
    pub fn parse(label: &str) -> Option<OrderType> {
        let label = label.trim();
        if label.is_empty() {
            return None;
        }
        if let Some(t) = Self::all().iter().find(|t| t.label() == label) {
            return Some(*t);
        }
        let lowered = label.to_lowercase();
        Self::all()
            .iter()
            .find(|t| t.label().to_lowercase() == lowered)
            .copied()
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for OrderType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for OrderType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        OrderType::parse(&label)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown order type '{}'", label)))
    }
}

/// Taxonomy entry for clients building type/sub-type pickers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomyEntry {
    pub label: &'static str,
    pub sub_types: &'static [&'static str],
}

pub fn catalog() -> Vec<TaxonomyEntry> {
    OrderType::all()
        .iter()
        .map(|t| TaxonomyEntry {
            label: t.label(),
            sub_types: t.sub_types(),
        })
        .collect()
}
