//! Schema definitions and field name normalization
//!
//! The parliament API publishes PascalCase field names in recent
//! legislatures, but older payloads mix camelCase and lowercase. Output is
//! normalized to snake_case with one fixed field set per entity type; names
//! outside the canonical set survive in the `extras` side field instead of
//! widening the schema.

use heck::ToSnakeCase;
use parlamento_common::EntityType;

/// Where a canonical name came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameOrigin {
    /// Found in the per-entity mapping table
    Mapped,
    /// Produced by the snake_case heuristic (flagged for observability)
    Heuristic,
}

// ============================================================================
// Field name mappings (source name -> canonical snake_case name)
// ============================================================================

/// Core initiative fields, as published since the XV legislature.
const INICIATIVAS_MAPPING: &[(&str, &str)] = &[
    ("IniNr", "ini_nr"),
    ("IniTipo", "ini_tipo"),
    ("IniDescTipo", "ini_desc_tipo"),
    ("IniLeg", "ini_leg"),
    ("IniSel", "ini_sel"),
    ("IniTitulo", "ini_titulo"),
    ("IniTextoSubst", "ini_texto_subst"),
    ("IniTextoSubstCampo", "ini_texto_subst_campo"),
    ("IniLinkTexto", "ini_link_texto"),
    ("IniId", "ini_id"),
    ("IniEpigrafe", "ini_epigrafe"),
    ("IniObs", "ini_obs"),
    ("DataInicioleg", "data_inicio_leg"),
    ("DataFimleg", "data_fim_leg"),
    // Nested structures (preserved as struct/list values)
    ("IniAutorOutros", "ini_autor_outros"),
    ("IniAutorDeputados", "ini_autor_deputados"),
    ("IniAutorGruposParlamentares", "ini_autor_grupos_parlamentares"),
    ("IniAnexos", "ini_anexos"),
    ("IniEventos", "ini_eventos"),
    ("IniciativasEuropeias", "iniciativas_europeias"),
    ("IniciativasOrigem", "iniciativas_origem"),
    ("IniciativasOriginadas", "iniciativas_originadas"),
    ("Links", "links"),
    ("Peticoes", "peticoes"),
    ("PropostasAlteracao", "propostas_alteracao"),
];

/// Vote events carry both initiative context (PascalCase) and the vote body
/// itself, which the source emits in lowercase/camelCase.
const VOTACOES_MAPPING: &[(&str, &str)] = &[
    ("Id", "vot_id"),
    ("id", "vot_id"),
    ("IniId", "ini_id"),
    ("IniNr", "ini_nr"),
    ("IniTitulo", "ini_titulo"),
    ("IniTipo", "ini_tipo"),
    ("Fase", "fase"),
    ("DataFase", "data_fase"),
    ("Data", "data"),
    ("Resultado", "resultado"),
    ("Descricao", "descricao"),
    ("Reuniao", "reuniao"),
    ("TipoReuniao", "tipo_reuniao"),
    ("tipoReuniao", "tipo_reuniao"),
    ("Unanime", "unanime"),
    ("Ausencias", "ausencias"),
    ("Detalhe", "detalhe"),
];

const ATIVIDADES_MAPPING: &[(&str, &str)] = &[
    ("Assunto", "ativ_assunto"),
    ("Tipo", "ativ_tipo"),
    ("DescTipo", "ativ_desc_tipo"),
    ("Numero", "ativ_numero"),
    ("Sessao", "sessao"),
    ("DataEntrada", "data_entrada"),
    ("DataAgendamentoDebate", "data_agendamento_debate"),
    ("DataAnuncio", "data_anuncio"),
    ("AutoresGP", "ativ_autores_gp"),
    ("TipoAutor", "ativ_tipo_autor"),
    ("Publicacao", "publicacao"),
    ("PublicacaoDebate", "publicacao_debate"),
    ("VotacaoDebate", "votacao_debate"),
    ("Observacoes", "observacoes"),
];

const ATIVIDADES_VOTACOES_MAPPING: &[(&str, &str)] = &[
    ("Id", "id"),
    ("AtivId", "ativ_id"),
    ("Assunto", "assunto"),
    ("Tipo", "tipo"),
    ("Numero", "numero"),
    ("DataEntrada", "data_entrada"),
    ("AutoresGP", "autores_gp"),
    ("Data", "data"),
    ("DataVotacao", "data_votacao"),
    ("Resultado", "resultado"),
    ("Descricao", "descricao"),
    ("Reuniao", "reuniao"),
    ("Unanime", "unanime"),
    ("Ausencias", "ausencias"),
    ("Detalhe", "detalhe"),
    ("VotosDetalhe", "votos_detalhe"),
];

const DEPUTADOS_MAPPING: &[(&str, &str)] = &[
    ("DepCadId", "dep_cad_id"),
    ("DepNomeParlamentar", "nome_parlamentar"),
    ("DepNomeCompleto", "nome_completo"),
    ("DepCPDes", "circulo_atual"),
    ("DepCPId", "circulo_id"),
    ("DepGP", "partido_historico"),
    ("DepSituacao", "situacao_historico"),
];

const PARTIDOS_MAPPING: &[(&str, &str)] = &[
    ("Sigla", "gp_sigla"),
    ("sigla", "gp_sigla"),
    ("Nome", "gp_nome"),
    ("nome", "gp_nome"),
];

const CIRCULOS_MAPPING: &[(&str, &str)] = &[
    ("CpId", "cp_id"),
    ("cpId", "cp_id"),
    ("CpDes", "cp_des"),
    ("cpDes", "cp_des"),
];

// ============================================================================
// Canonical field sets
// ============================================================================

const INICIATIVAS_FIELDS: &[&str] = &[
    "ini_id",
    "ini_nr",
    "ini_tipo",
    "ini_desc_tipo",
    "ini_leg",
    "ini_sel",
    "ini_titulo",
    "ini_epigrafe",
    "ini_obs",
    "ini_texto_subst",
    "ini_texto_subst_campo",
    "ini_link_texto",
    "data_inicio_leg",
    "data_fim_leg",
    "ini_autor_outros",
    "ini_autor_deputados",
    "ini_autor_grupos_parlamentares",
    "ini_anexos",
    "ini_eventos",
    "iniciativas_europeias",
    "iniciativas_origem",
    "iniciativas_originadas",
    "links",
    "peticoes",
    "propostas_alteracao",
];

const VOTACOES_FIELDS: &[&str] = &[
    "vot_id",
    "ini_id",
    "ini_nr",
    "ini_titulo",
    "ini_tipo",
    "fase",
    "data_fase",
    "data",
    "resultado",
    "descricao",
    "reuniao",
    "tipo_reuniao",
    "unanime",
    "ausencias",
    "detalhe",
];

const ATIVIDADES_FIELDS: &[&str] = &[
    "ativ_assunto",
    "ativ_tipo",
    "ativ_desc_tipo",
    "ativ_numero",
    "sessao",
    "data_entrada",
    "data_agendamento_debate",
    "data_anuncio",
    "ativ_autores_gp",
    "ativ_tipo_autor",
    "publicacao",
    "publicacao_debate",
    "votacao_debate",
    "observacoes",
];

const ATIVIDADES_VOTACOES_FIELDS: &[&str] = &[
    "id",
    "ativ_id",
    "assunto",
    "tipo",
    "numero",
    "data_entrada",
    "autores_gp",
    "data",
    "data_votacao",
    "resultado",
    "descricao",
    "reuniao",
    "unanime",
    "ausencias",
    "detalhe",
    "votos_detalhe",
];

const DEPUTADOS_FIELDS: &[&str] = &[
    "dep_cad_id",
    "nome_parlamentar",
    "nome_completo",
    "circulo_atual",
    "circulo_id",
    "partido_historico",
    "situacao_historico",
];

const PARTIDOS_FIELDS: &[&str] = &["gp_sigla", "gp_nome"];

const CIRCULOS_FIELDS: &[&str] = &["cp_id", "cp_des"];

// ============================================================================
// Derived and provenance fields
// ============================================================================

const INICIATIVAS_DERIVED: &[&str] = &["ini_data"];
const VOTACOES_DERIVED: &[&str] = &["detalhe_parsed", "is_nominal"];
const ATIVIDADES_DERIVED: &[&str] = &["ativ_id"];
const ATIVIDADES_VOTACOES_DERIVED: &[&str] = &["detalhe_parsed", "has_party_details", "source"];
const DEPUTADOS_DERIVED: &[&str] = &["partido_atual", "situacao_atual"];
const NO_DERIVED: &[&str] = &[];

/// Provenance fields attached to every record, plus the unknown-field
/// side structure.
pub const PROVENANCE_FIELDS: &[&str] = &["legislatura", "etl_timestamp", "extras"];

// ============================================================================
// Lookup API
// ============================================================================

/// The explicit mapping table for an entity type.
pub fn field_mapping(entity: EntityType) -> &'static [(&'static str, &'static str)] {
    match entity {
        EntityType::Iniciativas => INICIATIVAS_MAPPING,
        EntityType::Votacoes => VOTACOES_MAPPING,
        EntityType::Atividades => ATIVIDADES_MAPPING,
        EntityType::AtividadesVotacoes => ATIVIDADES_VOTACOES_MAPPING,
        EntityType::Deputados => DEPUTADOS_MAPPING,
        EntityType::Partidos => PARTIDOS_MAPPING,
        EntityType::Circulos => CIRCULOS_MAPPING,
    }
}

/// Canonical (source-mapped) field set for an entity type.
pub fn canonical_fields(entity: EntityType) -> &'static [&'static str] {
    match entity {
        EntityType::Iniciativas => INICIATIVAS_FIELDS,
        EntityType::Votacoes => VOTACOES_FIELDS,
        EntityType::Atividades => ATIVIDADES_FIELDS,
        EntityType::AtividadesVotacoes => ATIVIDADES_VOTACOES_FIELDS,
        EntityType::Deputados => DEPUTADOS_FIELDS,
        EntityType::Partidos => PARTIDOS_FIELDS,
        EntityType::Circulos => CIRCULOS_FIELDS,
    }
}

/// Fields computed by the transformer for an entity type.
pub fn derived_fields(entity: EntityType) -> &'static [&'static str] {
    match entity {
        EntityType::Iniciativas => INICIATIVAS_DERIVED,
        EntityType::Votacoes => VOTACOES_DERIVED,
        EntityType::Atividades => ATIVIDADES_DERIVED,
        EntityType::AtividadesVotacoes => ATIVIDADES_VOTACOES_DERIVED,
        EntityType::Deputados => DEPUTADOS_DERIVED,
        EntityType::Partidos | EntityType::Circulos => NO_DERIVED,
    }
}

/// The complete output field set: canonical + derived + provenance. This is
/// the stable schema every record of the entity type carries.
pub fn output_fields(entity: EntityType) -> Vec<&'static str> {
    canonical_fields(entity)
        .iter()
        .chain(derived_fields(entity))
        .chain(PROVENANCE_FIELDS)
        .copied()
        .collect()
}

/// The identifying field that must be non-null for a record to be accepted.
/// Atividades has none at this stage: its id is synthesized by the
/// transformer, which validates the source material instead.
pub fn required_field(entity: EntityType) -> Option<&'static str> {
    match entity {
        EntityType::Iniciativas => Some("ini_id"),
        EntityType::Votacoes => Some("vot_id"),
        EntityType::Atividades => None,
        EntityType::AtividadesVotacoes => Some("id"),
        EntityType::Deputados => Some("dep_cad_id"),
        EntityType::Partidos => Some("gp_sigla"),
        EntityType::Circulos => Some("cp_id"),
    }
}

/// Map one source field name to its canonical snake_case name.
///
/// Known names go through the explicit mapping table; unknown ones through a
/// deterministic snake_case conversion and are flagged as heuristic so the
/// normalizer can count them.
pub fn canonical_name(entity: EntityType, source: &str) -> (String, NameOrigin) {
    for (from, to) in field_mapping(entity) {
        if *from == source {
            return ((*to).to_string(), NameOrigin::Mapped);
        }
    }
    (source.to_snake_case(), NameOrigin::Heuristic)
}

/// Whether a canonical name is part of the entity's fixed field set.
pub fn is_canonical(entity: EntityType, name: &str) -> bool {
    canonical_fields(entity).contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapped_names() {
        let (name, origin) = canonical_name(EntityType::Iniciativas, "IniId");
        assert_eq!(name, "ini_id");
        assert_eq!(origin, NameOrigin::Mapped);

        let (name, _) = canonical_name(EntityType::Votacoes, "Id");
        assert_eq!(name, "vot_id");

        let (name, _) = canonical_name(EntityType::Votacoes, "tipoReuniao");
        assert_eq!(name, "tipo_reuniao");
    }

    #[test]
    fn test_heuristic_names() {
        let (name, origin) = canonical_name(EntityType::AtividadesVotacoes, "DataVotacao");
        assert_eq!(name, "data_votacao");
        assert_eq!(origin, NameOrigin::Mapped);

        // A field nobody has seen before still normalizes deterministically.
        let (name, origin) = canonical_name(EntityType::Iniciativas, "IniNovoCampoXPTO");
        assert_eq!(name, "ini_novo_campo_xpto");
        assert_eq!(origin, NameOrigin::Heuristic);

        let (name, _) = canonical_name(EntityType::Circulos, "cpDesAbrev");
        assert_eq!(name, "cp_des_abrev");
    }

    #[test]
    fn test_mapping_targets_are_canonical() {
        for entity in EntityType::ALL {
            for (_, to) in field_mapping(entity) {
                assert!(
                    is_canonical(entity, to),
                    "{entity}: mapping target '{to}' missing from canonical set"
                );
            }
        }
    }

    #[test]
    fn test_canonical_fields_are_snake_case() {
        for entity in EntityType::ALL {
            for field in output_fields(entity) {
                assert_eq!(
                    field,
                    field.to_snake_case(),
                    "{entity}: field '{field}' is not snake_case"
                );
            }
        }
    }

    #[test]
    fn test_required_fields_are_canonical() {
        for entity in EntityType::ALL {
            if let Some(required) = required_field(entity) {
                assert!(is_canonical(entity, required));
            }
        }
    }

    #[test]
    fn test_output_fields_include_provenance() {
        let fields = output_fields(EntityType::Partidos);
        assert!(fields.contains(&"legislatura"));
        assert!(fields.contains(&"etl_timestamp"));
        assert!(fields.contains(&"extras"));
        assert!(fields.contains(&"gp_sigla"));
    }
}
