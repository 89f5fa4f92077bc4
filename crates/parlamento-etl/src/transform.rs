//! Record transformation pipeline
//!
//! Turns one raw source document into a lazy stream of normalized records.
//! The document's top-level array is decoded into borrowed raw slices, and
//! each element is parsed, normalized, validated, enriched with derived
//! fields and stamped with provenance only when the stream is advanced, so
//! memory use beyond the raw buffer stays bounded by a single record.
//!
//! The stream is finite, non-restartable, and consumed exactly once per
//! partition by the columnar writer.

use crate::error::{RecordValidationError, TransformError};
use crate::normalize::{Normalized, SchemaNormalizer};
use crate::records::*;
use crate::schema;
use crate::votes::parse_detalhe;
use heck::ToSnakeCase;
use parlamento_common::hash::content_hash;
use parlamento_common::EntityType;
use serde_json::value::RawValue;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Detail texts at least this long list individual MPs rather than party
/// positions (nominal votes).
const NOMINAL_DETALHE_MIN_LEN: usize = 1000;

/// Per-run provenance, captured once and attached to every record.
#[derive(Debug, Clone)]
pub struct TransformContext {
    /// Legislature code, e.g. "L17"
    pub legislature: String,
    /// RFC 3339 processing timestamp, shared by the whole run
    pub etl_timestamp: String,
}

impl TransformContext {
    pub fn new(legislature: impl Into<String>, etl_timestamp: impl Into<String>) -> Self {
        Self {
            legislature: legislature.into(),
            etl_timestamp: etl_timestamp.into(),
        }
    }
}

/// Parses raw documents into normalized record streams.
#[derive(Debug, Clone, Default)]
pub struct RecordTransformer;

impl RecordTransformer {
    pub fn new() -> Self {
        Self
    }

    /// Build the lazy record stream for one partition's document.
    ///
    /// Fails only when the document itself is not a JSON array; individual
    /// malformed records surface as per-item validation errors instead.
    pub fn transform<'a>(
        &self,
        entity: EntityType,
        document: &'a [u8],
        ctx: &'a TransformContext,
    ) -> Result<RecordStream<'a>, TransformError> {
        let elements: Vec<&'a RawValue> = serde_json::from_slice(document)?;
        Ok(RecordStream {
            entity,
            ctx,
            elements: elements.into_iter().enumerate(),
            seen_ids: HashSet::new(),
        })
    }
}

/// Lazy, finite sequence of normalized records for one partition.
pub struct RecordStream<'a> {
    entity: EntityType,
    ctx: &'a TransformContext,
    elements: std::iter::Enumerate<std::vec::IntoIter<&'a RawValue>>,
    seen_ids: HashSet<String>,
}

impl Iterator for RecordStream<'_> {
    type Item = Result<NormalizedRecord, RecordValidationError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, raw) = self.elements.next()?;
        Some(self.build(index, raw))
    }
}

impl RecordStream<'_> {
    fn build(
        &mut self,
        index: usize,
        raw: &RawValue,
    ) -> Result<NormalizedRecord, RecordValidationError> {
        let object: Map<String, Value> = serde_json::from_str(raw.get())
            .map_err(|e| RecordValidationError::new(index, format!("not a JSON object: {e}")))?;

        let normalized = SchemaNormalizer::normalize(self.entity, object);

        if let Some(required) = schema::required_field(self.entity) {
            if normalized
                .fields
                .get(required)
                .map_or(true, Value::is_null)
            {
                return Err(RecordValidationError::new(
                    index,
                    format!("missing required field '{required}'"),
                ));
            }
        }

        let record = build_record(self.entity, normalized, self.ctx)
            .map_err(|reason| RecordValidationError::new(index, reason))?;

        // Identifiers are unique within (entity type, session).
        let id = record.identifier();
        if !self.seen_ids.insert(id.clone()) {
            return Err(RecordValidationError::new(
                index,
                format!("duplicate identifier '{id}'"),
            ));
        }

        Ok(record)
    }
}

// ============================================================================
// Record construction and derived fields
// ============================================================================

fn build_record(
    entity: EntityType,
    normalized: Normalized,
    ctx: &TransformContext,
) -> Result<NormalizedRecord, String> {
    let Normalized {
        mut fields, extras, ..
    } = normalized;
    let legislatura = ctx.legislature.clone();
    let etl_timestamp = ctx.etl_timestamp.clone();

    let record = match entity {
        EntityType::Iniciativas => {
            let ini_eventos = take(&mut fields, "ini_eventos");
            let ini_data = derive_ini_data(&ini_eventos);
            NormalizedRecord::Iniciativa(Box::new(Iniciativa {
                ini_id: take(&mut fields, "ini_id"),
                ini_nr: take(&mut fields, "ini_nr"),
                ini_tipo: take(&mut fields, "ini_tipo"),
                ini_desc_tipo: take(&mut fields, "ini_desc_tipo"),
                ini_leg: take(&mut fields, "ini_leg"),
                ini_sel: take(&mut fields, "ini_sel"),
                ini_titulo: take(&mut fields, "ini_titulo"),
                ini_epigrafe: take(&mut fields, "ini_epigrafe"),
                ini_obs: take(&mut fields, "ini_obs"),
                ini_texto_subst: take(&mut fields, "ini_texto_subst"),
                ini_texto_subst_campo: take(&mut fields, "ini_texto_subst_campo"),
                ini_link_texto: take(&mut fields, "ini_link_texto"),
                data_inicio_leg: take(&mut fields, "data_inicio_leg"),
                data_fim_leg: take(&mut fields, "data_fim_leg"),
                ini_autor_outros: take(&mut fields, "ini_autor_outros"),
                ini_autor_deputados: take(&mut fields, "ini_autor_deputados"),
                ini_autor_grupos_parlamentares: take(
                    &mut fields,
                    "ini_autor_grupos_parlamentares",
                ),
                ini_anexos: take(&mut fields, "ini_anexos"),
                ini_eventos,
                iniciativas_europeias: take(&mut fields, "iniciativas_europeias"),
                iniciativas_origem: take(&mut fields, "iniciativas_origem"),
                iniciativas_originadas: take(&mut fields, "iniciativas_originadas"),
                links: take(&mut fields, "links"),
                peticoes: take(&mut fields, "peticoes"),
                propostas_alteracao: take(&mut fields, "propostas_alteracao"),
                ini_data,
                legislatura,
                etl_timestamp,
                extras,
            }))
        }
        EntityType::Votacoes => {
            let detalhe = take(&mut fields, "detalhe");
            let detalhe_parsed = detalhe.as_str().and_then(parse_detalhe);
            let is_nominal = detalhe
                .as_str()
                .map_or(false, |s| s.chars().count() >= NOMINAL_DETALHE_MIN_LEN);
            NormalizedRecord::Votacao(Box::new(Votacao {
                vot_id: take(&mut fields, "vot_id"),
                ini_id: take(&mut fields, "ini_id"),
                ini_nr: take(&mut fields, "ini_nr"),
                ini_titulo: take(&mut fields, "ini_titulo"),
                ini_tipo: take(&mut fields, "ini_tipo"),
                fase: take(&mut fields, "fase"),
                data_fase: take(&mut fields, "data_fase"),
                data: take(&mut fields, "data"),
                resultado: take(&mut fields, "resultado"),
                descricao: take(&mut fields, "descricao"),
                reuniao: take(&mut fields, "reuniao"),
                tipo_reuniao: take(&mut fields, "tipo_reuniao"),
                unanime: take(&mut fields, "unanime"),
                ausencias: take(&mut fields, "ausencias"),
                detalhe,
                detalhe_parsed,
                is_nominal,
                legislatura,
                etl_timestamp,
                extras,
            }))
        }
        EntityType::Atividades => {
            let ativ_id = derive_ativ_id(&ctx.legislature, &fields)?;
            NormalizedRecord::Atividade(Box::new(Atividade {
                ativ_id,
                ativ_assunto: take(&mut fields, "ativ_assunto"),
                ativ_tipo: take(&mut fields, "ativ_tipo"),
                ativ_desc_tipo: take(&mut fields, "ativ_desc_tipo"),
                ativ_numero: take(&mut fields, "ativ_numero"),
                sessao: take(&mut fields, "sessao"),
                data_entrada: take(&mut fields, "data_entrada"),
                data_agendamento_debate: take(&mut fields, "data_agendamento_debate"),
                data_anuncio: take(&mut fields, "data_anuncio"),
                ativ_autores_gp: take(&mut fields, "ativ_autores_gp"),
                ativ_tipo_autor: take(&mut fields, "ativ_tipo_autor"),
                publicacao: take(&mut fields, "publicacao"),
                publicacao_debate: take(&mut fields, "publicacao_debate"),
                votacao_debate: take(&mut fields, "votacao_debate"),
                observacoes: take(&mut fields, "observacoes"),
                legislatura,
                etl_timestamp,
                extras,
            }))
        }
        EntityType::AtividadesVotacoes => {
            let detalhe = take(&mut fields, "detalhe");
            let votos_detalhe = take(&mut fields, "votos_detalhe");
            // The flag is a pure function of the party-breakdown field; the
            // upstream has used both spellings over time.
            let has_party_details =
                value_non_empty(&votos_detalhe) || value_non_empty(&detalhe);
            let detalhe_parsed = votos_detalhe
                .as_str()
                .or_else(|| detalhe.as_str())
                .and_then(parse_detalhe);
            NormalizedRecord::AtividadeVotacao(Box::new(AtividadeVotacao {
                id: take(&mut fields, "id"),
                ativ_id: take(&mut fields, "ativ_id"),
                assunto: take(&mut fields, "assunto"),
                tipo: take(&mut fields, "tipo"),
                numero: take(&mut fields, "numero"),
                data_entrada: take(&mut fields, "data_entrada"),
                autores_gp: take(&mut fields, "autores_gp"),
                data: take(&mut fields, "data"),
                data_votacao: take(&mut fields, "data_votacao"),
                resultado: take(&mut fields, "resultado"),
                descricao: take(&mut fields, "descricao"),
                reuniao: take(&mut fields, "reuniao"),
                unanime: take(&mut fields, "unanime"),
                ausencias: take(&mut fields, "ausencias"),
                detalhe,
                votos_detalhe,
                detalhe_parsed,
                has_party_details,
                source: "atividade",
                legislatura,
                etl_timestamp,
                extras,
            }))
        }
        EntityType::Deputados => {
            let partido_historico = normalize_history(
                take(&mut fields, "partido_historico"),
                &[
                    ("gpSigla", "gp_sigla"),
                    ("gpDtInicio", "gp_dt_inicio"),
                    ("gpDtFim", "gp_dt_fim"),
                    ("gpId", "gp_id"),
                ],
            );
            let situacao_historico = normalize_history(
                take(&mut fields, "situacao_historico"),
                &[
                    ("sioDes", "sio_des"),
                    ("sioDtInicio", "sio_dt_inicio"),
                    ("sioDtFim", "sio_dt_fim"),
                ],
            );
            let partido_atual = last_entry_value(&partido_historico, "gp_sigla");
            let situacao_atual = last_entry_value(&situacao_historico, "sio_des");
            NormalizedRecord::Deputado(Box::new(Deputado {
                dep_cad_id: take(&mut fields, "dep_cad_id"),
                nome_parlamentar: take(&mut fields, "nome_parlamentar"),
                nome_completo: take(&mut fields, "nome_completo"),
                circulo_atual: take(&mut fields, "circulo_atual"),
                circulo_id: take(&mut fields, "circulo_id"),
                partido_historico,
                situacao_historico,
                partido_atual,
                situacao_atual,
                legislatura,
                etl_timestamp,
                extras,
            }))
        }
        EntityType::Partidos => NormalizedRecord::Partido(Box::new(Partido {
            gp_sigla: take(&mut fields, "gp_sigla"),
            gp_nome: take(&mut fields, "gp_nome"),
            legislatura,
            etl_timestamp,
            extras,
        })),
        EntityType::Circulos => NormalizedRecord::Circulo(Box::new(Circulo {
            cp_id: take(&mut fields, "cp_id"),
            cp_des: take(&mut fields, "cp_des"),
            legislatura,
            etl_timestamp,
            extras,
        })),
    };

    Ok(record)
}

fn take(fields: &mut Map<String, Value>, name: &str) -> Value {
    fields.remove(name).unwrap_or(Value::Null)
}

/// Date the initiative was first known to parliament: the earliest event
/// date, typically the "Entrada" event.
fn derive_ini_data(eventos: &Value) -> Value {
    let Some(items) = eventos.as_array() else {
        return Value::Null;
    };
    items
        .iter()
        .filter_map(|ev| {
            ev.get("DataFase")
                .or_else(|| ev.get("dataFase"))
                .or_else(|| ev.get("data_fase"))
        })
        .filter_map(Value::as_str)
        .min()
        .map(|s| Value::String(s.to_string()))
        .unwrap_or(Value::Null)
}

/// Synthetic activity id: `<leg>_<tipo>_<numero>` when numbered, otherwise a
/// content hash of subject + entry date so re-runs produce identical ids.
fn derive_ativ_id(legislature: &str, fields: &Map<String, Value>) -> Result<String, String> {
    let tipo = scalar_string(fields.get("ativ_tipo"));
    let numero = scalar_string(fields.get("ativ_numero"));
    if let (Some(tipo), Some(numero)) = (&tipo, &numero) {
        return Ok(format!("{legislature}_{tipo}_{numero}"));
    }

    let assunto = scalar_string(fields.get("ativ_assunto"));
    let data_entrada = scalar_string(fields.get("data_entrada"));
    if assunto.is_none() && data_entrada.is_none() {
        return Err(
            "cannot derive activity id: no type+number and no subject/entry date".to_string(),
        );
    }
    let digest = content_hash(&[
        assunto.as_deref().unwrap_or(""),
        data_entrada.as_deref().unwrap_or(""),
    ]);
    Ok(format!("{legislature}_{}", &digest[..32]))
}

fn scalar_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Whether a party-breakdown value actually carries information.
fn value_non_empty(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

/// Re-emit a nested history array with snake_case member names; anything
/// other than an array of objects passes through untouched.
fn normalize_history(value: Value, mapping: &[(&str, &str)]) -> Value {
    let Value::Array(items) = value else {
        return value;
    };
    Value::Array(
        items
            .into_iter()
            .map(|item| match item {
                Value::Object(obj) => {
                    let mut out = Map::new();
                    for (key, v) in obj {
                        let canonical = mapping
                            .iter()
                            .find(|(from, _)| *from == key)
                            .map(|(_, to)| (*to).to_string())
                            .unwrap_or_else(|| key.to_snake_case());
                        out.insert(canonical, v);
                    }
                    Value::Object(out)
                }
                other => other,
            })
            .collect(),
    )
}

fn last_entry_value(history: &Value, key: &str) -> Value {
    history
        .as_array()
        .and_then(|items| items.last())
        .and_then(|entry| entry.get(key))
        .cloned()
        .unwrap_or(Value::Null)
}
