use campaign_kit::brand_kit::{BrandKit, BrandKitStore};
use campaign_kit::diagram::{self, DiagramOptions, Theme};
use campaign_kit::error::{BrandKitError, Error};
use campaign_kit::evidence::EvidenceStore;
use campaign_kit::slides::{self, Column, Deck, ImagePosition, Slide};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use tempfile::TempDir;

fn acme() -> BrandKit {
    BrandKit::new("#0A2540", "#FFFFFF", "#635BFF")
        .with_fonts("Poppins", "Inter")
        .with_logo(Some("assets/acme.png".to_string()))
}

// --- Brand kits ---

#[test]
fn test_brand_kit_file_layout() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("brand_kits.json");

    let mut store = BrandKitStore::load(&path).unwrap();
    store.create("acme", acme()).unwrap();
    store.create("zeta", BrandKit::new("#111", "#222", "#333")).unwrap();

    let on_disk: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(
        on_disk["acme"],
        json!({
            "colors": {"primary": "#0A2540", "secondary": "#FFFFFF", "accent": "#635BFF"},
            "fonts": {"headline": "Poppins", "body": "Inter"},
            "logo": "assets/acme.png",
            "watermark": null
        })
    );
    assert_eq!(on_disk["zeta"]["fonts"]["body"], "Inter");

    let reloaded = BrandKitStore::load(&path).unwrap();
    let names: Vec<&str> = reloaded.list().into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["acme", "zeta"]);
}

#[test]
fn test_brand_kit_delete_and_suggest() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("brand_kits.json");
    let mut store = BrandKitStore::load(&path).unwrap();
    store.create("acme", acme()).unwrap();

    match store.delete("acm") {
        Err(Error::BrandKit(BrandKitError::NotFound { suggestion, .. })) => {
            assert_eq!(suggestion.as_deref(), Some("acme"));
        }
        other => panic!("expected NotFound, got {:?}", other),
    }

    store.delete("acme").unwrap();
    assert!(BrandKitStore::load(&path).unwrap().is_empty());
}

// --- Diagrams ---

#[test]
fn test_builtin_template_fully_rendered() {
    let options = DiagramOptions {
        title: "Customer Journey".to_string(),
        theme: Theme::parse_lenient("neutral"),
        background: "#0A2540".to_string(),
    };
    let html = diagram::render(diagram::BUILTIN_TEMPLATE, "graph TD; A-->B", &options);

    assert!(diagram::unresolved_placeholders(&html).is_empty());
    assert_eq!(html.matches("Customer Journey").count(), 2);
    assert!(html.contains("theme: 'neutral'"));
    assert!(html.contains("#0A2540"));
    assert!(html.contains("graph TD; A-->B"));
}

#[test]
fn test_custom_template_reports_leftovers() {
    let tmp = TempDir::new().unwrap();
    let template_path = tmp.path().join("t.html");
    fs::write(&template_path, "<h1>{{DIAGRAM_TITLE}}</h1><p>{{FOOTER}}</p>{{MERMAID_CODE}}").unwrap();

    let template = diagram::read_template(Some(&template_path)).unwrap();
    let html = diagram::render(&template, "graph LR; X", &DiagramOptions::default());
    assert!(html.starts_with("<h1>Flow Diagram</h1>"));
    assert_eq!(diagram::unresolved_placeholders(&html), vec!["FOOTER".to_string()]);
}

// --- Decks ---

#[test]
fn test_deck_with_brand_kit() {
    let tmp = TempDir::new().unwrap();
    let mut deck = Deck::new("Q3 Launch: Transit & Rail", "Board review");
    deck.push(Slide::Content {
        title: "Goals".to_string(),
        bullets: vec!["Ridership +10%".to_string(), "<b>not bold</b>".to_string()],
    });
    deck.push(Slide::ContentWithImage {
        title: "Creative".to_string(),
        bullets: vec![],
        image: "outputs/images/hero.png".to_string(),
        image_position: ImagePosition::Left,
    });
    deck.push(Slide::TwoColumn {
        title: "Options".to_string(),
        left: Column {
            heading: "Digital".to_string(),
            bullets: vec!["Search".to_string()],
        },
        right: Column {
            heading: "Outdoor".to_string(),
            bullets: vec!["Bus wraps".to_string()],
        },
    });

    let path = slides::write_deck(&deck, tmp.path(), Some(&acme())).unwrap();
    assert_eq!(path, tmp.path().join("Q3_Launch_Transit__Rail.html"));

    let html = fs::read_to_string(path).unwrap();
    assert!(html.contains("--primary: #0A2540"));
    assert!(html.contains("Poppins"));
    assert!(html.contains("&lt;b&gt;not bold&lt;/b&gt;"));
    assert!(html.contains("outputs/images/hero.png"));
    assert!(html.contains("assets/acme.png"));
    assert_eq!(html.matches("<section").count(), 4);
}

#[test]
fn test_deck_rejects_missing_image() {
    let tmp = TempDir::new().unwrap();
    let mut deck = Deck::new("Deck", "");
    deck.push(Slide::FullImage {
        title: "Hero".to_string(),
        image: " ".to_string(),
    });
    let err = slides::write_deck(&deck, tmp.path(), None).unwrap_err();
    assert!(err.to_string().contains('1'));
}

// --- Evidence ---

#[test]
fn test_evidence_filters_across_collections() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("case_studies.json"),
        r#"[{"client": "Metro Transit", "sector": "Transit", "year": 2023},
            {"client": "Acme Retail", "sector": "Retail", "year": 2021}]"#,
    )
    .unwrap();
    fs::write(
        tmp.path().join("bios.json"),
        r#"[{"name": "Dana Ruiz", "sector": "transit"}, {"name": "Lee Park"}]"#,
    )
    .unwrap();
    fs::write(tmp.path().join("notes.json"), r#"[{"sector": "transit"}]"#).unwrap();

    let store = EvidenceStore::load(tmp.path()).unwrap();
    assert_eq!(store.len(), 4);

    let mut filters = BTreeMap::new();
    filters.insert("sector".to_string(), "TRANSIT".to_string());
    let found = store.get(&filters);
    assert_eq!(found.case_studies.len(), 1);
    assert_eq!(found.bios.len(), 1);
    assert_eq!(found.bios[0]["name"], "Dana Ruiz");

    filters.insert("year".to_string(), "2023".to_string());
    let found = store.get(&filters);
    assert_eq!(found.case_studies.len(), 1);
    assert!(found.bios.is_empty());
}
