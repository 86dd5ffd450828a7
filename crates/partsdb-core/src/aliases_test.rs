use std::io::Write;

use super::*;

fn brand(canonical: &str, aliases: &[&str]) -> BrandAliasConfig {
    BrandAliasConfig {
        canonical: canonical.to_string(),
        aliases: aliases.iter().map(ToString::to_string).collect(),
    }
}

#[test]
fn render_joins_with_pipe_delimiter() {
    assert_eq!(
        render_alias_blob(&["Febi", "Febi Bilstein", "FEBI-BILSTEIN"]),
        "Febi | Febi Bilstein | FEBI-BILSTEIN"
    );
}

#[test]
fn render_empty_list_is_empty_blob() {
    let empty: [&str; 0] = [];
    assert_eq!(render_alias_blob(&empty), "");
}

#[test]
fn parse_accepts_bare_and_spaced_separators() {
    assert_eq!(
        parse_alias_blob("Lemforder| Lemförder |LEMFOERDER"),
        vec!["Lemforder", "Lemförder", "LEMFOERDER"]
    );
}

#[test]
fn parse_drops_blank_entries() {
    assert_eq!(parse_alias_blob(" | Mann | | "), vec!["Mann"]);
}

#[test]
fn clean_collapses_case_insensitive_duplicates_keeping_first() {
    assert_eq!(
        clean_aliases(["Bosch", "BOSCH", " bosch ", "Robert Bosch"]),
        vec!["Bosch", "Robert Bosch"]
    );
}

#[test]
fn alias_blob_of_config_entry() {
    let entry = brand("Mann-Filter", &["Mann", " MANN FILTER "]);
    assert_eq!(entry.alias_blob(), "Mann | MANN FILTER");
}

#[test]
fn validate_rejects_empty_canonical() {
    let file = AliasesFile {
        brands: vec![brand("   ", &[])],
    };
    let err = validate_aliases(&file).unwrap_err();
    assert!(err.to_string().contains("non-empty"));
}

#[test]
fn validate_rejects_case_insensitive_duplicate_canonical() {
    let file = AliasesFile {
        brands: vec![brand("Sachs", &[]), brand("SACHS", &["ZF Sachs"])],
    };
    let err = validate_aliases(&file).unwrap_err();
    assert!(err.to_string().contains("duplicate canonical brand"));
}

#[test]
fn validate_rejects_alias_with_delimiter() {
    let file = AliasesFile {
        brands: vec![brand("Valeo", &["Valeo | Service"])],
    };
    let err = validate_aliases(&file).unwrap_err();
    assert!(err.to_string().contains("delimiter"));
}

#[test]
fn validate_accepts_valid_file() {
    let file = AliasesFile {
        brands: vec![brand("Valeo", &["VALEO SERVICE"]), brand("Sachs", &[])],
    };
    assert!(validate_aliases(&file).is_ok());
}

#[test]
fn load_aliases_from_yaml_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(
        file,
        "brands:\n  - canonical: Febi\n    aliases: [\"Febi Bilstein\", \"FEBI-BILSTEIN\"]\n  - canonical: Mahle"
    )
    .expect("write yaml");

    let loaded = load_aliases(file.path()).expect("load aliases");
    assert_eq!(loaded.brands.len(), 2);
    assert_eq!(loaded.brands[0].alias_blob(), "Febi Bilstein | FEBI-BILSTEIN");
    assert!(loaded.brands[1].aliases.is_empty());
}

#[test]
fn load_aliases_missing_file_is_io_error() {
    let err = load_aliases(Path::new("/definitely/not/here.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::AliasesFileIo { .. }));
}
