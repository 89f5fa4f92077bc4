//! Common types used across ParlamentoDB

use serde::{Deserialize, Serialize};

/// The record categories produced by the ETL pipeline.
///
/// Each entity type corresponds to one source document per legislature and
/// one Parquet artifact per (legislature, entity type) partition. Dataset
/// names are the Portuguese ones used by the upstream source and kept in the
/// output paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// Legislative initiatives (bills, draft resolutions, ...)
    Iniciativas,
    /// Votes attached to initiative events
    Votacoes,
    /// Parliamentary activities outside the legislative process
    Atividades,
    /// Votes held during activity debates
    AtividadesVotacoes,
    /// Deputies (members of parliament)
    Deputados,
    /// Parliamentary groups / parties
    Partidos,
    /// Electoral circles
    Circulos,
}

impl EntityType {
    /// All entity types, in processing order. Iniciativas first since it is
    /// by far the largest document and benefits from starting early.
    pub const ALL: [EntityType; 7] = [
        EntityType::Iniciativas,
        EntityType::Votacoes,
        EntityType::Atividades,
        EntityType::AtividadesVotacoes,
        EntityType::Deputados,
        EntityType::Partidos,
        EntityType::Circulos,
    ];

    /// Dataset name used in source URLs and artifact file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Iniciativas => "iniciativas",
            EntityType::Votacoes => "votacoes",
            EntityType::Atividades => "atividades",
            EntityType::AtividadesVotacoes => "atividades_votacoes",
            EntityType::Deputados => "deputados",
            EntityType::Partidos => "partidos",
            EntityType::Circulos => "circulos",
        }
    }
}

impl std::str::FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "iniciativas" => Ok(EntityType::Iniciativas),
            "votacoes" => Ok(EntityType::Votacoes),
            "atividades" => Ok(EntityType::Atividades),
            "atividades_votacoes" => Ok(EntityType::AtividadesVotacoes),
            "deputados" => Ok(EntityType::Deputados),
            "partidos" => Ok(EntityType::Partidos),
            "circulos" => Ok(EntityType::Circulos),
            other => Err(format!(
                "unknown entity type '{}' (expected one of: {})",
                other,
                EntityType::ALL
                    .iter()
                    .map(|e| e.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit of work and output granularity: one legislature crossed with one
/// entity type. Partitions are independent; each owns a distinct output path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Partition {
    /// Legislature code, e.g. "L17"
    pub legislature: String,
    /// Entity type processed for that legislature
    pub entity: EntityType,
}

impl Partition {
    pub fn new(legislature: impl Into<String>, entity: EntityType) -> Self {
        Self {
            legislature: legislature.into(),
            entity,
        }
    }

    /// Stem used for artifact file names, e.g. "votacoes_l17".
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.entity.as_str(), self.legislature.to_lowercase())
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.legislature, self.entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_round_trip() {
        for entity in EntityType::ALL {
            let parsed: EntityType = entity.as_str().parse().unwrap();
            assert_eq!(parsed, entity);
        }
    }

    #[test]
    fn test_entity_type_unknown() {
        let err = "plenarias".parse::<EntityType>().unwrap_err();
        assert!(err.contains("unknown entity type"));
        assert!(err.contains("iniciativas"));
    }

    #[test]
    fn test_partition_file_stem() {
        let partition = Partition::new("L17", EntityType::AtividadesVotacoes);
        assert_eq!(partition.file_stem(), "atividades_votacoes_l17");
        assert_eq!(partition.to_string(), "L17/atividades_votacoes");
    }
}
