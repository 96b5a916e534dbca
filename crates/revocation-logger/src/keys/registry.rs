//! CA Registry for the revocation logger
//!
//! Holds every CA the logger knows about:
//! - Public keys used to authenticate revocation submissions
//! - Base URLs the relay calls to trigger a revocation
//! - The operator each CA belongs to, for operator-weighted selection
//!
//! The registry is built once at start-up and read-only afterwards, so it is
//! shared between request handlers without locking.

use rand::seq::SliceRandom;
use rand::Rng;
use revocation_core::PublicKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{info, warn};

/// A certificate authority whose revocation updates the logger accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaEntity {
    /// Opaque CA identifier
    pub id: String,

    /// Key the CA signs submissions with
    pub public_key: PublicKey,

    /// Base URL of the CA's revocation service
    pub url: String,

    /// Operator running this CA
    pub operator: String,
}

/// How the relay picks a CA when asked to trigger a revocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Uniform over every allow-listed CA
    #[default]
    Flat,

    /// Uniform over operators, then uniform over that operator's CAs
    ByOperator,
}

/// Read-only registry of known CAs
#[derive(Debug, Clone)]
pub struct CaRegistry {
    /// Every known CA (id -> entity)
    entities: HashMap<String, CaEntity>,

    /// CAs the relay may pick, grouped by operator in a stable order
    relay_pool: Vec<(String, Vec<String>)>,

    /// Selection policy for `random_entity`
    policy: SelectionPolicy,
}

impl CaRegistry {
    /// Build a registry from known CAs
    ///
    /// `allow_list` restricts which CAs the relay may pick. `None` allows
    /// every CA; ids missing from `entities` are skipped with a warning.
    /// Lookups always cover every known CA.
    pub fn new(
        entities: impl IntoIterator<Item = CaEntity>,
        allow_list: Option<&[String]>,
        policy: SelectionPolicy,
    ) -> Self {
        let entities: HashMap<String, CaEntity> = entities
            .into_iter()
            .map(|entity| (entity.id.clone(), entity))
            .collect();

        let allowed: HashSet<&str> = match allow_list {
            Some(ids) => {
                for id in ids {
                    if !entities.contains_key(id) {
                        warn!(ca_id = %id, "Allow-listed CA is not in the CA list, skipping");
                    }
                }
                ids.iter().map(String::as_str).collect()
            }
            None => entities.keys().map(String::as_str).collect(),
        };

        let mut by_operator: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for entity in entities.values() {
            if allowed.contains(entity.id.as_str()) {
                by_operator
                    .entry(entity.operator.clone())
                    .or_default()
                    .push(entity.id.clone());
            }
        }
        let relay_pool: Vec<(String, Vec<String>)> = by_operator
            .into_iter()
            .map(|(operator, mut ids)| {
                ids.sort();
                (operator, ids)
            })
            .collect();

        info!(
            ca_count = entities.len(),
            relay_pool = relay_pool.iter().map(|(_, ids)| ids.len()).sum::<usize>(),
            policy = ?policy,
            "CA registry initialized"
        );

        Self {
            entities,
            relay_pool,
            policy,
        }
    }

    /// Look up a CA by id
    pub fn lookup(&self, ca_id: &str) -> Option<&CaEntity> {
        self.entities.get(ca_id)
    }

    /// Number of known CAs
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether no CA is known
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Number of CAs the relay may pick from
    pub fn relay_pool_size(&self) -> usize {
        self.relay_pool.iter().map(|(_, ids)| ids.len()).sum()
    }

    /// Selection policy in effect
    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Pick a CA for the relay, or `None` if the pool is empty
    pub fn random_entity(&self) -> Option<&CaEntity> {
        self.random_entity_with(&mut rand::thread_rng())
    }

    /// Pick a CA using the given random source
    pub fn random_entity_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&CaEntity> {
        let id = match self.policy {
            SelectionPolicy::Flat => {
                let total = self.relay_pool_size();
                if total == 0 {
                    return None;
                }
                let mut index = rng.gen_range(0..total);
                let mut picked = None;
                for (_, ids) in &self.relay_pool {
                    if index < ids.len() {
                        picked = Some(&ids[index]);
                        break;
                    }
                    index -= ids.len();
                }
                picked?
            }
            SelectionPolicy::ByOperator => {
                let (_, ids) = self.relay_pool.choose(rng)?;
                ids.choose(rng)?
            }
        };
        self.entities.get(id)
    }
}
