use std::path::PathBuf;

use anyhow::Context;
use tracing::warn;

use crate::{
    catalog::model::{AssetKind, AssetRecord, TemplateRecord},
    foundation::error::{StageError, StageResult},
};

/// Supplies catalog documents. `Ok(None)` means the document does not exist
/// (distinct from a malformed one, which is an error).
pub trait CatalogSource {
    fn load_templates(&self) -> StageResult<Option<Vec<TemplateRecord>>>;
    fn load_assets(&self) -> StageResult<Option<Vec<AssetRecord>>>;
}

/// Reads `templates.json` and `assets.json` from a directory.
#[derive(Clone, Debug)]
pub struct JsonDirSource {
    root: PathBuf,
}

impl JsonDirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read_doc<T: serde::de::DeserializeOwned>(
        &self,
        file_name: &str,
    ) -> StageResult<Option<Vec<T>>> {
        let path = self.root.join(file_name);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path)
            .with_context(|| format!("read catalog document '{}'", path.display()))?;
        let records = serde_json::from_slice(&bytes)
            .map_err(|e| StageError::serde(format!("parse '{}': {e}", path.display())))?;
        Ok(Some(records))
    }
}

impl CatalogSource for JsonDirSource {
    fn load_templates(&self) -> StageResult<Option<Vec<TemplateRecord>>> {
        self.read_doc("templates.json")
    }

    fn load_assets(&self) -> StageResult<Option<Vec<AssetRecord>>> {
        self.read_doc("assets.json")
    }
}

/// Owned template/asset catalog.
///
/// Unlike an ambient once-loaded cache, the catalog is an explicit value with a
/// defined refresh policy: [`Catalog::refresh`] re-reads the source and
/// replaces the record lists wholesale. When a source document is missing the
/// built-in curated records are used instead.
pub struct Catalog {
    source: Box<dyn CatalogSource>,
    templates: Vec<TemplateRecord>,
    assets: Vec<AssetRecord>,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("templates", &self.templates.len())
            .field("assets", &self.assets.len())
            .finish()
    }
}

impl Catalog {
    pub fn load(source: impl CatalogSource + 'static) -> StageResult<Self> {
        let mut catalog = Self {
            source: Box::new(source),
            templates: Vec::new(),
            assets: Vec::new(),
        };
        catalog.refresh()?;
        Ok(catalog)
    }

    /// Re-read both documents from the source, replacing current records.
    pub fn refresh(&mut self) -> StageResult<()> {
        self.templates = match self.source.load_templates()? {
            Some(records) => records,
            None => {
                warn!("templates.json not found, using curated fallback templates");
                fallback_templates()
            }
        };
        self.assets = match self.source.load_assets()? {
            Some(records) => records,
            None => {
                warn!("assets.json not found, using curated fallback assets");
                fallback_assets()
            }
        };
        Ok(())
    }

    pub fn templates(&self) -> &[TemplateRecord] {
        &self.templates
    }

    pub fn assets(&self) -> &[AssetRecord] {
        &self.assets
    }

    pub fn template(&self, id: &str) -> Option<&TemplateRecord> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn asset(&self, id: &str) -> Option<&AssetRecord> {
        self.assets.iter().find(|a| a.id == id)
    }

    pub fn assets_of_kind(&self, kind: AssetKind) -> impl Iterator<Item = &AssetRecord> {
        self.assets.iter().filter(move |a| a.kind == kind)
    }
}

fn fallback_templates() -> Vec<TemplateRecord> {
    let t = |id: &str, name: &str, url: &str, category: &str, tags: &[&str]| TemplateRecord {
        id: id.to_string(),
        name: name.to_string(),
        url: url.to_string(),
        category: category.to_string(),
        tags: tags.iter().map(|s| s.to_string()).collect(),
    };
    vec![
        t(
            "1",
            "Surprised Pikachu",
            "templates/surprised-pikachu.png",
            "reaction",
            &["pokemon", "shocked", "surprised", "reaction"],
        ),
        t(
            "2",
            "This is Fine",
            "templates/this-is-fine.jpg",
            "situation",
            &["dog", "fire", "calm", "chaos", "fine"],
        ),
        t(
            "3",
            "Spider-Man Pointing",
            "templates/spiderman-pointing.png",
            "pointing",
            &["spiderman", "pointing", "same", "identical"],
        ),
        t(
            "4",
            "Woman Yelling at Cat",
            "templates/woman-yelling-cat.jpg",
            "argument",
            &["woman", "cat", "yelling", "table", "dinner"],
        ),
    ]
}

fn fallback_assets() -> Vec<AssetRecord> {
    vec![
        AssetRecord {
            id: "logo-1".to_string(),
            name: "Site Logo".to_string(),
            url: "assets/logo.webp".to_string(),
            kind: AssetKind::Logo,
            category: "branding".to_string(),
        },
        AssetRecord {
            id: "pfp-1".to_string(),
            name: "Sample Avatar".to_string(),
            url: "pfps/sample.webp".to_string(),
            kind: AssetKind::Pfp,
            category: "avatars".to_string(),
        },
    ]
}

#[cfg(test)]
#[path = "../../tests/unit/catalog/source.rs"]
mod tests;
