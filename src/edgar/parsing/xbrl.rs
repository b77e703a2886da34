use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::diagnostics::{count_kind, Diagnostic, DiagnosticKind};
use super::document::{DocumentFormat, HtmlDocument, TaggedDocument, TaggedElement, XmlDocument};
use super::types::{Context, ContextPeriod, Decimals, Fact, FactStore, Unit, UnitMeasure};
use crate::edgar::filing::FilingMetadata;
use crate::error::Result;

/// Result of one extraction: the store plus everything irregular that was
/// noticed along the way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    #[serde(flatten)]
    pub store: FactStore,
    pub diagnostics: Vec<Diagnostic>,
}

impl Extraction {
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        count_kind(&self.diagnostics, kind)
    }

    /// Share of facts whose context reference did not resolve.
    pub fn orphan_ratio(&self) -> f64 {
        let total = self.store.fact_count();
        if total == 0 {
            return 0.0;
        }
        self.count(DiagnosticKind::OrphanedContextReference) as f64 / total as f64
    }
}

/// Parses `content` in the given format and extracts its facts. The only
/// failure is unparseable markup; everything else becomes a diagnostic.
pub fn extract_document(
    content: &str,
    metadata: &FilingMetadata,
    format: DocumentFormat,
) -> Result<Extraction> {
    let extraction = match format {
        DocumentFormat::Xml => extract(&XmlDocument::parse(&metadata.document_name, content)?, metadata),
        DocumentFormat::Html => {
            extract(&HtmlDocument::parse(&metadata.document_name, content)?, metadata)
        }
    };
    Ok(extraction)
}

/// Single pass over the document's tagged elements.
pub fn extract<D: TaggedDocument>(document: &D, metadata: &FilingMetadata) -> Extraction {
    let mut store = FactStore::new();
    let mut diagnostics = Vec::new();
    let elements = document.elements();

    // Context and unit declarations
    for element in elements.iter().filter(|e| is_declaration(*e, "context")) {
        match parse_context(element) {
            Ok(context) => {
                let id = context.id.clone();
                if store.insert_context(context).is_some() {
                    diagnostics.push(
                        Diagnostic::new(
                            DiagnosticKind::MalformedContext,
                            format!("Context {} declared more than once, keeping the last", id),
                        )
                        .with_context_ref(&id),
                    );
                }
            }
            Err(diagnostic) => diagnostics.push(diagnostic),
        }
    }

    for element in elements.iter().filter(|e| is_declaration(*e, "unit")) {
        match parse_unit(element) {
            Ok(unit) => {
                let id = unit.id.clone();
                if store.insert_unit(unit).is_some() {
                    diagnostics.push(Diagnostic::new(
                        DiagnosticKind::MalformedUnit,
                        format!("Unit {} declared more than once, keeping the last", id),
                    ));
                }
            }
            Err(diagnostic) => diagnostics.push(diagnostic),
        }
    }

    log::debug!(
        "{}: {} contexts, {} units",
        document.name(),
        store.contexts.len(),
        store.units.len()
    );

    // Facts
    for element in elements.iter() {
        let Some(context_ref) = element.attribute("contextRef") else {
            continue;
        };
        let fact = parse_fact(element, context_ref, &mut diagnostics);
        log::debug!(
            "Fact: {} {} {} {}",
            fact.concept,
            fact.value,
            fact.context_ref,
            fact.unit_ref.as_deref().unwrap_or("no unit")
        );
        store.insert_fact(fact);
    }

    check_references(&store, &mut diagnostics);

    for diagnostic in &diagnostics {
        log::debug!("{}: {}", document.name(), diagnostic);
    }
    log::info!(
        "Extracted {} facts from {} ({} {} ending {}) with {} diagnostics",
        store.fact_count(),
        document.name(),
        metadata.identifier,
        metadata.filing_kind,
        metadata.period_end_date,
        diagnostics.len()
    );

    Extraction { store, diagnostics }
}

/// "INF" in any case is infinite precision; integers are decimal places;
/// anything else is absent.
pub fn parse_decimals(raw: Option<&str>) -> Option<Decimals> {
    let raw = raw?.trim();
    if raw.eq_ignore_ascii_case("INF") {
        Some(Decimals::Infinite)
    } else {
        raw.parse().ok().map(Decimals::Places)
    }
}

fn is_declaration<E: TaggedElement>(element: &E, name: &str) -> bool {
    element.has_local_name(name) && element.attribute("contextRef").is_none()
}

fn declared_id<E: TaggedElement>(element: &E) -> Option<String> {
    non_empty(element.attribute("id"))
}

fn parse_fact<E: TaggedElement>(
    element: &E,
    context_ref: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Fact {
    // Inline documents carry the concept in `name`; instance documents in the tag
    let concept = match element.attribute("name") {
        Some(name) => name.to_string(),
        None => {
            let tag = element.tag_name();
            if !element.preserves_case() {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::CaseFoldedConcept,
                        format!("Concept {} taken from a lowercased HTML tag name", tag),
                    )
                    .with_concept(&tag)
                    .with_context_ref(context_ref),
                );
            }
            tag
        }
    };
    let mut fact = Fact::new(&concept, element.text().trim(), context_ref);

    fact.unit_ref = non_empty(element.attribute("unitRef"));
    fact.id = non_empty(element.attribute("id"));
    fact.negated = element.attribute("sign").map(str::trim) == Some("-");

    let raw_decimals = element.attribute("decimals");
    fact.decimals = parse_decimals(raw_decimals);
    if fact.decimals.is_none() {
        let message = match raw_decimals {
            Some(raw) => format!("Unparsable decimals {:?} on {}", raw, concept),
            None => format!("{} has no decimals attribute", concept),
        };
        diagnostics.push(
            Diagnostic::new(DiagnosticKind::UnparsableDecimals, message)
                .with_concept(&concept)
                .with_context_ref(context_ref),
        );
    }

    if let Some(raw) = element.attribute("scale") {
        match raw.trim().parse::<i32>() {
            Ok(scale) => fact.scale = Some(scale),
            Err(_) => diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::UnparsableScale,
                    format!("Unparsable scale {:?} on {}", raw, concept),
                )
                .with_concept(&concept)
                .with_context_ref(context_ref),
            ),
        }
    }

    fact
}

fn parse_context<E: TaggedElement>(element: &E) -> std::result::Result<Context, Diagnostic> {
    let id = declared_id(element).ok_or_else(|| {
        Diagnostic::new(
            DiagnosticKind::MalformedContext,
            "Context skipped: declaration has no id",
        )
    })?;
    let malformed = |reason: &str| {
        Diagnostic::new(
            DiagnosticKind::MalformedContext,
            format!("Context {} skipped: {}", id, reason),
        )
        .with_context_ref(&id)
    };

    let period = element
        .descendants_named("period")
        .into_iter()
        .next()
        .ok_or_else(|| malformed("no period"))?;

    let date_of = |name: &str| -> std::result::Result<Option<NaiveDate>, Diagnostic> {
        match period.descendants_named(name).first() {
            Some(node) => parse_date(&node.text())
                .map(Some)
                .ok_or_else(|| malformed(&format!("invalid {} {:?}", name, node.text().trim()))),
            None => Ok(None),
        }
    };

    let period = match (date_of("instant")?, date_of("startDate")?, date_of("endDate")?) {
        (Some(instant_date), _, _) => ContextPeriod::Instant { instant_date },
        (None, Some(start_date), Some(end_date)) => ContextPeriod::Duration {
            start_date,
            end_date,
        },
        _ if !period.descendants_named("forever").is_empty() => {
            return Err(malformed("forever periods have no dates"))
        }
        _ => return Err(malformed("period has neither an instant nor start and end dates")),
    };

    Ok(Context {
        id: id.clone(),
        period,
        segment: segment_key(element),
    })
}

/// Opaque key built from the dimension members of a context's segment and
/// scenario, in document order.
fn segment_key<E: TaggedElement>(context: &E) -> Option<String> {
    let mut members = Vec::new();
    for container in ["segment", "scenario"] {
        for holder in context.descendants_named(container) {
            let explicit = holder.descendants_named("explicitMember");
            let typed = holder.descendants_named("typedMember");
            if explicit.is_empty() && typed.is_empty() {
                let text = holder.text();
                if !text.trim().is_empty() {
                    members.push(text.split_whitespace().collect::<Vec<_>>().join(" "));
                }
                continue;
            }
            for member in explicit.iter().chain(typed.iter()) {
                members.push(format!(
                    "{}={}",
                    member.attribute("dimension").unwrap_or_default(),
                    member.text().trim()
                ));
            }
        }
    }

    if members.is_empty() {
        None
    } else {
        Some(members.join(";"))
    }
}

fn parse_unit<E: TaggedElement>(element: &E) -> std::result::Result<Unit, Diagnostic> {
    let id = declared_id(element).ok_or_else(|| {
        Diagnostic::new(DiagnosticKind::MalformedUnit, "Unit skipped: declaration has no id")
    })?;
    let malformed = |reason: &str| {
        Diagnostic::new(
            DiagnosticKind::MalformedUnit,
            format!("Unit {} skipped: {}", id, reason),
        )
    };

    let measures = |holder: &E| -> Option<String> {
        let measures: Vec<String> = holder
            .descendants_named("measure")
            .iter()
            .map(|m| m.text().trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
        if measures.is_empty() {
            None
        } else {
            Some(measures.join("*"))
        }
    };

    let measure = match element.descendants_named("divide").first() {
        Some(divide) => {
            let numerator = divide
                .descendants_named("unitNumerator")
                .first()
                .and_then(|n| measures(n))
                .ok_or_else(|| malformed("divide without numerator"))?;
            let denominator = divide
                .descendants_named("unitDenominator")
                .first()
                .and_then(|d| measures(d))
                .ok_or_else(|| malformed("divide without denominator"))?;
            UnitMeasure::Divide {
                numerator,
                denominator,
            }
        }
        None => UnitMeasure::simple(measures(element).ok_or_else(|| malformed("no measure"))?),
    };

    Ok(Unit { id, measure })
}

fn check_references(store: &FactStore, diagnostics: &mut Vec<Diagnostic>) {
    for fact in store.iter_facts() {
        if store.context(&fact.context_ref).is_none() {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::OrphanedContextReference,
                    format!(
                        "{} references undeclared context {}",
                        fact.concept, fact.context_ref
                    ),
                )
                .with_concept(&fact.concept)
                .with_context_ref(&fact.context_ref),
            );
        }

        if let Some(unit_ref) = &fact.unit_ref {
            if store.unit(unit_ref).is_none() {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::OrphanedUnitReference,
                        format!("{} references undeclared unit {}", fact.concept, unit_ref),
                    )
                    .with_concept(&fact.concept)
                    .with_context_ref(&fact.context_ref),
                );
            }
        }
    }
}

/// XBRL dates, tolerating a trailing time component.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
