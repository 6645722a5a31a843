//! Annuaire en mémoire de la hiérarchie administrative
//!
//! Chargé une fois par import: la résolution des codes se fait ensuite sans
//! aller-retour vers la base.

use std::collections::HashMap;

use deadpool_postgres::GenericClient;
use tracing::debug;

use crate::import::row::RowError;
use crate::models::{ZoneKey, ZoneLevel};

/// Zone connue: identifiant, parent, code et nom
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneEntry {
    pub id: i32,
    pub parent: Option<i32>,
    pub code: String,
    pub name: String,
    pub level: ZoneLevel,
}

impl ZoneEntry {
    pub fn new(id: i32, parent: Option<i32>, code: &str, name: &str) -> Self {
        Self {
            id,
            parent,
            code: code.to_string(),
            name: name.to_string(),
            level: ZoneLevel::Country,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct LevelIndex {
    entries: Vec<ZoneEntry>,
    by_code: HashMap<String, usize>,
    by_id: HashMap<i32, usize>,
}

/// Index code → zone et id → zone, par niveau
#[derive(Debug, Clone, Default)]
pub struct ZoneDirectory {
    levels: [LevelIndex; 4],
}

fn slot(level: ZoneLevel) -> usize {
    match level {
        ZoneLevel::Country => 0,
        ZoneLevel::Region => 1,
        ZoneLevel::Department => 2,
        ZoneLevel::Commune => 3,
    }
}

fn parent_level(level: ZoneLevel) -> Option<ZoneLevel> {
    match level {
        ZoneLevel::Country => None,
        ZoneLevel::Region => Some(ZoneLevel::Country),
        ZoneLevel::Department => Some(ZoneLevel::Region),
        ZoneLevel::Commune => Some(ZoneLevel::Department),
    }
}

impl ZoneDirectory {
    pub fn insert(&mut self, level: ZoneLevel, mut entry: ZoneEntry) {
        entry.level = level;
        let index = &mut self.levels[slot(level)];
        let position = index.entries.len();
        index.by_code.insert(entry.code.clone(), position);
        index.by_id.insert(entry.id, position);
        index.entries.push(entry);
    }

    /// Zones d'un niveau, dans l'ordre de chargement
    pub fn entries(&self, level: ZoneLevel) -> &[ZoneEntry] {
        &self.levels[slot(level)].entries
    }

    pub fn find(&self, level: ZoneLevel, code: &str) -> Option<&ZoneEntry> {
        let index = &self.levels[slot(level)];
        index.by_code.get(code.trim()).map(|&i| &index.entries[i])
    }

    pub fn get(&self, level: ZoneLevel, id: i32) -> Option<&ZoneEntry> {
        let index = &self.levels[slot(level)];
        index.by_id.get(&id).map(|&i| &index.entries[i])
    }

    /// Comme [`find`](Self::find), en erreur de ligne si le code est inconnu
    pub fn require(&self, level: ZoneLevel, code: &str) -> Result<&ZoneEntry, RowError> {
        self.find(level, code).ok_or_else(|| RowError::UnknownCode {
            level,
            code: code.trim().to_string(),
        })
    }

    /// Vérifie que `child` est rattaché à `parent`
    pub fn check_parent(&self, child: &ZoneEntry, parent: &ZoneEntry) -> Result<(), RowError> {
        if child.parent == Some(parent.id) {
            Ok(())
        } else {
            Err(RowError::HierarchyMismatch {
                level: child.level,
                code: child.code.clone(),
                parent: parent.code.clone(),
            })
        }
    }

    /// Chaîne complète des ancêtres d'une zone désignée par son code
    pub fn chain(&self, level: ZoneLevel, code: &str) -> Result<ZoneKey, RowError> {
        let mut key = ZoneKey::default();
        let mut current = Some(self.require(level, code)?);

        while let Some(entry) = current {
            match entry.level {
                ZoneLevel::Country => key.country = Some(entry.id),
                ZoneLevel::Region => key.region = Some(entry.id),
                ZoneLevel::Department => key.department = Some(entry.id),
                ZoneLevel::Commune => key.commune = Some(entry.id),
            }
            current = match (parent_level(entry.level), entry.parent) {
                (Some(up), Some(parent_id)) => Some(self.get(up, parent_id).ok_or_else(|| {
                    RowError::UnknownCode {
                        level: up,
                        code: format!("#{}", parent_id),
                    }
                })?),
                _ => None,
            };
        }

        Ok(key)
    }

    pub fn len(&self) -> usize {
        self.levels.iter().map(|l| l.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Charge toute la hiérarchie depuis la base
    pub async fn load<C: GenericClient>(
        client: &C,
        schema: &str,
    ) -> Result<Self, tokio_postgres::Error> {
        let queries = [
            (
                ZoneLevel::Country,
                format!("SELECT id, NULL::int4, code, name FROM {}.country ORDER BY id", schema),
            ),
            (
                ZoneLevel::Region,
                format!(
                    "SELECT id, country_id, adm1_pcode, adm1_en FROM {}.region ORDER BY adm1_pcode",
                    schema
                ),
            ),
            (
                ZoneLevel::Department,
                format!(
                    "SELECT id, region_id, adm2_pcode, adm2_en FROM {}.department ORDER BY adm2_pcode",
                    schema
                ),
            ),
            (
                ZoneLevel::Commune,
                format!(
                    "SELECT id, department_id, adm3_pcode, adm3_en FROM {}.commune ORDER BY adm3_pcode",
                    schema
                ),
            ),
        ];

        let mut directory = Self::default();
        for (level, sql) in &queries {
            for row in client.query(sql.as_str(), &[]).await? {
                let code: String = row.get(2);
                let name: String = row.get(3);
                directory.insert(*level, ZoneEntry::new(row.get(0), row.get(1), &code, &name));
            }
        }

        debug!(
            countries = directory.entries(ZoneLevel::Country).len(),
            regions = directory.entries(ZoneLevel::Region).len(),
            departments = directory.entries(ZoneLevel::Department).len(),
            communes = directory.entries(ZoneLevel::Commune).len(),
            "Zone directory loaded"
        );
        Ok(directory)
    }
}
