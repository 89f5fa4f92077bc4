//! Schema normalization
//!
//! Maps raw source objects onto the canonical field set of their entity
//! type. Known source names go through the explicit mapping tables; unknown
//! ones through the deterministic snake_case heuristic. Nothing is dropped:
//! names outside the canonical set are preserved in the `extras` side
//! structure, and every canonical field is present in the output (explicit
//! `null` when the source omitted it), so all records of an entity type
//! share the same field set.

use crate::schema::{self, NameOrigin};
use parlamento_common::EntityType;
use serde_json::{Map, Value};
use tracing::debug;

/// Output of [`SchemaNormalizer::normalize`]: the canonical fields (complete,
/// with explicit nulls) plus the unknown-field side structure.
#[derive(Debug)]
pub struct Normalized {
    /// Canonical field name -> value; contains every canonical field of the
    /// entity type
    pub fields: Map<String, Value>,
    /// Unknown source fields as canonical JSON text, `None` when the record
    /// had none
    pub extras: Option<String>,
    /// How many field names were converted heuristically (not found in the
    /// mapping table)
    pub heuristic_names: usize,
}

/// Maps raw records onto canonical, schema-stable shapes.
pub struct SchemaNormalizer;

impl SchemaNormalizer {
    /// Normalize one raw record of the given entity type.
    ///
    /// Nested arrays and objects pass through as structured values; they are
    /// never flattened into joined strings.
    pub fn normalize(entity: EntityType, raw: Map<String, Value>) -> Normalized {
        let mut fields = Map::new();
        for name in schema::canonical_fields(entity) {
            fields.insert((*name).to_string(), Value::Null);
        }

        let mut extras = Map::new();
        let mut heuristic_names = 0;

        for (key, value) in raw {
            let (canonical, origin) = schema::canonical_name(entity, &key);
            if origin == NameOrigin::Heuristic {
                heuristic_names += 1;
                debug!(
                    entity = %entity,
                    source_field = %key,
                    canonical_field = %canonical,
                    "field name normalized heuristically"
                );
            }
            if schema::is_canonical(entity, &canonical) {
                fields.insert(canonical, value);
            } else {
                // Unknown field: preserved, not discarded, but kept out of
                // the canonical schema.
                extras.insert(canonical, value);
            }
        }

        let extras = if extras.is_empty() {
            None
        } else {
            Some(Value::Object(extras).to_string())
        };

        Normalized {
            fields,
            extras,
            heuristic_names,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_known_names_are_mapped() {
        let raw = as_map(json!({"IniId": "1234", "IniTitulo": "Uma lei"}));
        let normalized = SchemaNormalizer::normalize(EntityType::Iniciativas, raw);
        assert_eq!(normalized.fields["ini_id"], json!("1234"));
        assert_eq!(normalized.fields["ini_titulo"], json!("Uma lei"));
        assert_eq!(normalized.heuristic_names, 0);
    }

    #[test]
    fn test_missing_fields_are_explicit_nulls() {
        let raw = as_map(json!({"Sigla": "PS"}));
        let normalized = SchemaNormalizer::normalize(EntityType::Partidos, raw);
        assert_eq!(normalized.fields["gp_sigla"], json!("PS"));
        // gp_nome was absent from the source; still present, null.
        assert!(normalized.fields.contains_key("gp_nome"));
        assert!(normalized.fields["gp_nome"].is_null());
    }

    #[test]
    fn test_schema_is_stable_across_records() {
        let sparse = SchemaNormalizer::normalize(
            EntityType::Votacoes,
            as_map(json!({"id": "1"})),
        );
        let full = SchemaNormalizer::normalize(
            EntityType::Votacoes,
            as_map(json!({"id": "2", "Resultado": "Aprovado", "unanime": "unanime"})),
        );
        let sparse_keys: Vec<_> = sparse.fields.keys().collect();
        let full_keys: Vec<_> = full.fields.keys().collect();
        assert_eq!(sparse_keys, full_keys);
    }

    #[test]
    fn test_unknown_fields_go_to_extras() {
        let raw = as_map(json!({"cpId": 5, "CampoNovo": {"a": 1}}));
        let normalized = SchemaNormalizer::normalize(EntityType::Circulos, raw);
        assert_eq!(normalized.fields["cp_id"], json!(5));
        assert!(!normalized.fields.contains_key("campo_novo"));
        let extras: Value =
            serde_json::from_str(normalized.extras.as_deref().unwrap()).unwrap();
        assert_eq!(extras["campo_novo"], json!({"a": 1}));
        assert_eq!(normalized.heuristic_names, 1);
    }

    #[test]
    fn test_nested_values_preserved_structurally() {
        let eventos = json!([{"Fase": "Entrada", "DataFase": "2025-01-02"}]);
        let raw = as_map(json!({"IniId": "1", "IniEventos": eventos}));
        let normalized = SchemaNormalizer::normalize(EntityType::Iniciativas, raw);
        assert_eq!(
            normalized.fields["ini_eventos"],
            json!([{"Fase": "Entrada", "DataFase": "2025-01-02"}])
        );
    }

    #[test]
    fn test_no_extras_is_none() {
        let raw = as_map(json!({"cpId": 5, "cpDes": "Porto"}));
        let normalized = SchemaNormalizer::normalize(EntityType::Circulos, raw);
        assert!(normalized.extras.is_none());
    }
}
