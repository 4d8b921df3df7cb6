use super::*;

struct StubSource {
    templates: Option<Vec<TemplateRecord>>,
    assets: Option<Vec<AssetRecord>>,
}

impl StubSource {
    fn new(templates: Option<Vec<TemplateRecord>>, assets: Option<Vec<AssetRecord>>) -> Self {
        Self { templates, assets }
    }
}

impl CatalogSource for StubSource {
    fn load_templates(&self) -> StageResult<Option<Vec<TemplateRecord>>> {
        Ok(self.templates.clone())
    }

    fn load_assets(&self) -> StageResult<Option<Vec<AssetRecord>>> {
        Ok(self.assets.clone())
    }
}

fn template(id: &str, name: &str) -> TemplateRecord {
    TemplateRecord {
        id: id.to_string(),
        name: name.to_string(),
        url: format!("templates/{id}.png"),
        category: "misc".to_string(),
        tags: vec![],
    }
}

#[test]
fn missing_documents_fall_back_to_curated_records() {
    let catalog = Catalog::load(StubSource::new(None, None)).unwrap();
    assert!(!catalog.templates().is_empty());
    assert!(!catalog.assets().is_empty());
    assert!(catalog.template("1").is_some());
    assert_eq!(catalog.assets_of_kind(AssetKind::Logo).count(), 1);
}

#[test]
fn present_documents_replace_fallbacks() {
    let catalog = Catalog::load(StubSource::new(
        Some(vec![template("d1", "Drake")]),
        Some(vec![]),
    ))
    .unwrap();
    assert_eq!(catalog.templates().len(), 1);
    assert_eq!(catalog.template("d1").unwrap().name, "Drake");
    assert!(catalog.template("1").is_none());
    assert!(catalog.assets().is_empty());
}

#[test]
fn refresh_rereads_the_source() {
    let source = StubSource::new(Some(vec![template("a", "A")]), None);
    let mut catalog = Catalog::load(source).unwrap();
    assert_eq!(catalog.templates().len(), 1);

    // A second refresh replaces the record list wholesale rather than merging.
    catalog.refresh().unwrap();
    assert_eq!(catalog.templates().len(), 1);
    assert!(catalog.asset("pfp-1").is_some());
}

#[test]
fn json_dir_source_reports_missing_as_none() {
    let source = JsonDirSource::new("/definitely/not/a/real/dir");
    assert!(source.load_templates().unwrap().is_none());
    assert!(source.load_assets().unwrap().is_none());
}
