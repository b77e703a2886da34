use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

static NUMERIC_NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,\s$€£]").expect("valid regex"));

/// Reporting period of a context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContextPeriod {
    Instant {
        instant_date: NaiveDate,
    },
    Duration {
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub id: String,
    #[serde(flatten)]
    pub period: ContextPeriod,
    /// Dimensional qualifiers, kept as an opaque key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
}

impl Context {
    pub fn is_instant(&self) -> bool {
        matches!(self.period, ContextPeriod::Instant { .. })
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        match self.period {
            ContextPeriod::Instant { .. } => None,
            ContextPeriod::Duration { start_date, .. } => Some(start_date),
        }
    }

    /// Instant date, or the last day of a duration.
    pub fn end_date(&self) -> NaiveDate {
        match self.period {
            ContextPeriod::Instant { instant_date } => instant_date,
            ContextPeriod::Duration { end_date, .. } => end_date,
        }
    }

    pub fn duration_days(&self) -> Option<i64> {
        self.start_date()
            .map(|start| self.end_date().signed_duration_since(start).num_days())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UnitMeasure {
    Divide {
        numerator: String,
        denominator: String,
    },
    Measure {
        measure: String,
    },
}

impl UnitMeasure {
    pub fn simple(measure: impl Into<String>) -> Self {
        UnitMeasure::Measure {
            measure: measure.into(),
        }
    }

    pub fn is_monetary(&self) -> bool {
        let measure = match self {
            UnitMeasure::Measure { measure } => measure,
            UnitMeasure::Divide { numerator, .. } => numerator,
        };
        measure.to_lowercase().starts_with("iso4217:")
    }

    pub fn is_shares(&self) -> bool {
        matches!(self, UnitMeasure::Measure { measure } if measure.eq_ignore_ascii_case("xbrli:shares"))
    }
}

impl fmt::Display for UnitMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitMeasure::Measure { measure } => write!(f, "{}", measure),
            UnitMeasure::Divide {
                numerator,
                denominator,
            } => write!(f, "{}/{}", numerator, denominator),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    #[serde(flatten)]
    pub measure: UnitMeasure,
}

/// Precision of a numeric fact. `Infinite` is the "INF" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decimals {
    Infinite,
    Places(i32),
}

impl Decimals {
    pub fn as_f64(&self) -> f64 {
        match self {
            Decimals::Infinite => f64::INFINITY,
            Decimals::Places(places) => f64::from(*places),
        }
    }
}

impl fmt::Display for Decimals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decimals::Infinite => write!(f, "INF"),
            Decimals::Places(places) => write!(f, "{}", places),
        }
    }
}

impl Serialize for Decimals {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Decimals::Infinite => serializer.serialize_str("INF"),
            Decimals::Places(places) => serializer.serialize_i32(*places),
        }
    }
}

impl<'de> Deserialize<'de> for Decimals {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Places(i32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Places(places) => Ok(Decimals::Places(places)),
            Raw::Text(text) if text.eq_ignore_ascii_case("INF") => Ok(Decimals::Infinite),
            Raw::Text(text) => text
                .trim()
                .parse()
                .map(Decimals::Places)
                .map_err(|_| serde::de::Error::custom(format!("invalid decimals: {}", text))),
        }
    }
}

/// A single tagged value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub concept: String,
    pub value: String,
    pub context_ref: String,
    #[serde(rename = "unit", default, skip_serializing_if = "Option::is_none")]
    pub unit_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<Decimals>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<i32>,
    /// Inline `sign="-"`: the displayed value is the magnitude
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub negated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Fact {
    pub fn new(concept: &str, value: &str, context_ref: &str) -> Self {
        Self {
            concept: concept.to_string(),
            value: value.to_string(),
            context_ref: context_ref.to_string(),
            unit_ref: None,
            decimals: None,
            scale: None,
            negated: false,
            id: None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.unit_ref.is_some()
    }

    /// Namespace prefix of the concept, e.g. "us-gaap".
    pub fn prefix(&self) -> Option<&str> {
        self.concept.split_once(':').map(|(prefix, _)| prefix)
    }

    /// Parses the displayed value, applying scale and sign. Returns `None`
    /// for text facts and values that are not numbers.
    pub fn numeric_value(&self) -> Option<f64> {
        let cleaned = NUMERIC_NOISE.replace_all(&self.value, "");
        let (digits, parenthesized) = match cleaned
            .strip_prefix('(')
            .and_then(|inner| inner.strip_suffix(')'))
        {
            Some(inner) => (inner, true),
            None => (&cleaned[..], false),
        };

        // f64 parsing would otherwise accept "inf" and "NaN"
        if !digits.chars().any(|c| c.is_ascii_digit()) {
            return None;
        }
        let mut number: f64 = digits.parse().ok()?;
        if let Some(scale) = self.scale {
            number *= 10f64.powi(scale);
        }
        if self.negated != parenthesized {
            number = -number;
        }
        Some(number)
    }
}

/// Facts keyed by context and concept, with the context and unit tables
/// declared by the same document.
///
/// Each concept maps to a list: repeated facts for one concept in one
/// context are all kept, in document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactStore {
    pub contexts: BTreeMap<String, Context>,
    pub units: BTreeMap<String, Unit>,
    pub facts: BTreeMap<String, BTreeMap<String, Vec<Fact>>>,
}

impl FactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_context(&mut self, context: Context) -> Option<Context> {
        self.contexts.insert(context.id.clone(), context)
    }

    pub fn insert_unit(&mut self, unit: Unit) -> Option<Unit> {
        self.units.insert(unit.id.clone(), unit)
    }

    /// Appends the fact; never replaces an existing one.
    pub fn insert_fact(&mut self, fact: Fact) {
        self.facts
            .entry(fact.context_ref.clone())
            .or_default()
            .entry(fact.concept.clone())
            .or_default()
            .push(fact);
    }

    pub fn context(&self, id: &str) -> Option<&Context> {
        self.contexts.get(id)
    }

    pub fn unit(&self, id: &str) -> Option<&Unit> {
        self.units.get(id)
    }

    pub fn facts_for(&self, context_ref: &str, concept: &str) -> &[Fact] {
        self.facts
            .get(context_ref)
            .and_then(|concepts| concepts.get(concept))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All facts for a concept across contexts.
    pub fn facts_by_concept(&self, concept: &str) -> Vec<&Fact> {
        self.facts
            .values()
            .filter_map(|concepts| concepts.get(concept))
            .flatten()
            .collect()
    }

    pub fn iter_facts(&self) -> impl Iterator<Item = &Fact> {
        self.facts.values().flat_map(|concepts| concepts.values().flatten())
    }

    pub fn fact_count(&self) -> usize {
        self.iter_facts().count()
    }

    pub fn concepts(&self) -> Vec<String> {
        let mut concepts: Vec<String> = self
            .facts
            .values()
            .flat_map(|concepts| concepts.keys().cloned())
            .collect();
        concepts.sort();
        concepts.dedup();
        concepts
    }

    /// Context ids referenced by facts but never declared.
    pub fn orphaned_context_refs(&self) -> Vec<&str> {
        self.facts
            .keys()
            .filter(|id| !self.contexts.contains_key(*id))
            .map(String::as_str)
            .collect()
    }

    /// Concept/context pairs holding more than one distinct value.
    pub fn conflicting_duplicates(&self) -> Vec<(&str, &str, &[Fact])> {
        let mut conflicts = Vec::new();
        for (context_ref, concepts) in &self.facts {
            for (concept, facts) in concepts {
                if facts.iter().any(|f| f.value != facts[0].value) {
                    conflicts.push((context_ref.as_str(), concept.as_str(), facts.as_slice()));
                }
            }
        }
        conflicts
    }
}
