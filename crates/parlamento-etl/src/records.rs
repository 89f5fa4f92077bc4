//! Normalized record types
//!
//! One explicit variant per entity type, each with the fixed canonical field
//! set of that entity. Scalars and nested structures keep their source JSON
//! representation (`serde_json::Value`, `Null` when absent) since the
//! upstream is not consistent about scalar types across legislatures; the
//! field *set* is what the pipeline guarantees.
//!
//! Every record also carries the provenance block (`legislatura`,
//! `etl_timestamp`) and the `extras` side field holding unknown source
//! fields as canonical JSON text.

use crate::votes::DetalheVotos;
use parlamento_common::EntityType;
use serde::Serialize;
use serde_json::Value;

/// Legislative initiative (bill, draft resolution, ...).
#[derive(Debug, Clone, Serialize)]
pub struct Iniciativa {
    pub ini_id: Value,
    pub ini_nr: Value,
    pub ini_tipo: Value,
    pub ini_desc_tipo: Value,
    pub ini_leg: Value,
    pub ini_sel: Value,
    pub ini_titulo: Value,
    pub ini_epigrafe: Value,
    pub ini_obs: Value,
    pub ini_texto_subst: Value,
    pub ini_texto_subst_campo: Value,
    pub ini_link_texto: Value,
    pub data_inicio_leg: Value,
    pub data_fim_leg: Value,
    pub ini_autor_outros: Value,
    pub ini_autor_deputados: Value,
    pub ini_autor_grupos_parlamentares: Value,
    pub ini_anexos: Value,
    pub ini_eventos: Value,
    pub iniciativas_europeias: Value,
    pub iniciativas_origem: Value,
    pub iniciativas_originadas: Value,
    pub links: Value,
    pub peticoes: Value,
    pub propostas_alteracao: Value,
    /// Date the initiative was first known to parliament (earliest event)
    pub ini_data: Value,
    pub legislatura: String,
    pub etl_timestamp: String,
    pub extras: Option<String>,
}

/// Vote attached to an initiative event.
#[derive(Debug, Clone, Serialize)]
pub struct Votacao {
    pub vot_id: Value,
    pub ini_id: Value,
    pub ini_nr: Value,
    pub ini_titulo: Value,
    pub ini_tipo: Value,
    pub fase: Value,
    pub data_fase: Value,
    pub data: Value,
    pub resultado: Value,
    pub descricao: Value,
    pub reuniao: Value,
    pub tipo_reuniao: Value,
    pub unanime: Value,
    pub ausencias: Value,
    pub detalhe: Value,
    pub detalhe_parsed: Option<DetalheVotos>,
    /// True when the detail text lists individual MPs (nominal vote)
    pub is_nominal: bool,
    pub legislatura: String,
    pub etl_timestamp: String,
    pub extras: Option<String>,
}

/// Parliamentary activity outside the legislative process.
#[derive(Debug, Clone, Serialize)]
pub struct Atividade {
    /// Synthetic id: `<leg>_<tipo>_<numero>`, or a content hash when the
    /// activity has no number
    pub ativ_id: String,
    pub ativ_assunto: Value,
    pub ativ_tipo: Value,
    pub ativ_desc_tipo: Value,
    pub ativ_numero: Value,
    pub sessao: Value,
    pub data_entrada: Value,
    pub data_agendamento_debate: Value,
    pub data_anuncio: Value,
    pub ativ_autores_gp: Value,
    pub ativ_tipo_autor: Value,
    pub publicacao: Value,
    pub publicacao_debate: Value,
    pub votacao_debate: Value,
    pub observacoes: Value,
    pub legislatura: String,
    pub etl_timestamp: String,
    pub extras: Option<String>,
}

/// Vote held during an activity debate.
#[derive(Debug, Clone, Serialize)]
pub struct AtividadeVotacao {
    pub id: Value,
    pub ativ_id: Value,
    pub assunto: Value,
    pub tipo: Value,
    pub numero: Value,
    pub data_entrada: Value,
    pub autores_gp: Value,
    pub data: Value,
    pub data_votacao: Value,
    pub resultado: Value,
    pub descricao: Value,
    pub reuniao: Value,
    pub unanime: Value,
    pub ausencias: Value,
    pub detalhe: Value,
    pub votos_detalhe: Value,
    pub detalhe_parsed: Option<DetalheVotos>,
    /// True iff a non-empty per-party breakdown is present in the source.
    /// Unanimous votes legitimately lack one; this flag is the data-quality
    /// signal for that, never "fixed" downstream.
    pub has_party_details: bool,
    /// Distinguishes these votes from initiative votes in merged views
    pub source: &'static str,
    pub legislatura: String,
    pub etl_timestamp: String,
    pub extras: Option<String>,
}

/// Deputy (member of parliament).
#[derive(Debug, Clone, Serialize)]
pub struct Deputado {
    pub dep_cad_id: Value,
    pub nome_parlamentar: Value,
    pub nome_completo: Value,
    pub circulo_atual: Value,
    pub circulo_id: Value,
    /// Party membership history, re-emitted with snake_case member names
    pub partido_historico: Value,
    /// Mandate situation history, re-emitted with snake_case member names
    pub situacao_historico: Value,
    pub partido_atual: Value,
    pub situacao_atual: Value,
    pub legislatura: String,
    pub etl_timestamp: String,
    pub extras: Option<String>,
}

/// Parliamentary group / party.
#[derive(Debug, Clone, Serialize)]
pub struct Partido {
    pub gp_sigla: Value,
    pub gp_nome: Value,
    pub legislatura: String,
    pub etl_timestamp: String,
    pub extras: Option<String>,
}

/// Electoral circle.
#[derive(Debug, Clone, Serialize)]
pub struct Circulo {
    pub cp_id: Value,
    pub cp_des: Value,
    pub legislatura: String,
    pub etl_timestamp: String,
    pub extras: Option<String>,
}

/// A schema-normalized record, tagged by entity type.
///
/// Serializes transparently as the inner record, so the columnar writer sees
/// exactly the entity's output field set.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum NormalizedRecord {
    Iniciativa(Box<Iniciativa>),
    Votacao(Box<Votacao>),
    Atividade(Box<Atividade>),
    AtividadeVotacao(Box<AtividadeVotacao>),
    Deputado(Box<Deputado>),
    Partido(Box<Partido>),
    Circulo(Box<Circulo>),
}

impl NormalizedRecord {
    pub fn entity_type(&self) -> EntityType {
        match self {
            NormalizedRecord::Iniciativa(_) => EntityType::Iniciativas,
            NormalizedRecord::Votacao(_) => EntityType::Votacoes,
            NormalizedRecord::Atividade(_) => EntityType::Atividades,
            NormalizedRecord::AtividadeVotacao(_) => EntityType::AtividadesVotacoes,
            NormalizedRecord::Deputado(_) => EntityType::Deputados,
            NormalizedRecord::Partido(_) => EntityType::Partidos,
            NormalizedRecord::Circulo(_) => EntityType::Circulos,
        }
    }

    /// The record's identifying value, as a string.
    pub fn identifier(&self) -> String {
        fn stringify(v: &Value) -> String {
            match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }
        }
        match self {
            NormalizedRecord::Iniciativa(r) => stringify(&r.ini_id),
            NormalizedRecord::Votacao(r) => stringify(&r.vot_id),
            NormalizedRecord::Atividade(r) => r.ativ_id.clone(),
            NormalizedRecord::AtividadeVotacao(r) => stringify(&r.id),
            NormalizedRecord::Deputado(r) => stringify(&r.dep_cad_id),
            NormalizedRecord::Partido(r) => stringify(&r.gp_sigla),
            NormalizedRecord::Circulo(r) => stringify(&r.cp_id),
        }
    }

    /// Serialize to a JSON value (used by the columnar writer).
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;

    #[test]
    fn test_record_field_set_matches_schema() {
        // The struct definitions and the schema module must agree on the
        // output field set of every entity type.
        let partido = NormalizedRecord::Partido(Box::new(Partido {
            gp_sigla: Value::String("PS".into()),
            gp_nome: Value::Null,
            legislatura: "L17".into(),
            etl_timestamp: "2025-01-01T00:00:00Z".into(),
            extras: None,
        }));
        let value = partido.to_value().unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        let mut expected = schema::output_fields(EntityType::Partidos);
        expected.sort_unstable();
        let mut actual = keys.clone();
        actual.sort_unstable();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_none_extras_serializes_as_null() {
        let circulo = NormalizedRecord::Circulo(Box::new(Circulo {
            cp_id: Value::from(1),
            cp_des: Value::String("Lisboa".into()),
            legislatura: "L16".into(),
            etl_timestamp: "2025-01-01T00:00:00Z".into(),
            extras: None,
        }));
        let value = circulo.to_value().unwrap();
        assert!(value.get("extras").unwrap().is_null());
    }

    #[test]
    fn test_identifier_stringifies_numbers() {
        let circulo = NormalizedRecord::Circulo(Box::new(Circulo {
            cp_id: Value::from(42),
            cp_des: Value::Null,
            legislatura: "L16".into(),
            etl_timestamp: "2025-01-01T00:00:00Z".into(),
            extras: None,
        }));
        assert_eq!(circulo.identifier(), "42");
    }
}
