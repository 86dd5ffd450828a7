//! Live integration tests for partsdb-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/partsdb-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.

use partsdb_core::{BrandAliasConfig, MatchKind};
use partsdb_db::{
    apply_catalog_writes, bulk_create_mappings, clear_brand_aliases, create_brand_alias,
    create_group, create_job_run, create_mapping, delete_catalog_item, delete_group,
    fail_job_run, find_catalog_items_by_prefix, finish_job_run, get_brand_alias, get_job_run,
    get_mapping, list_brand_aliases, list_catalog_items, list_groups, list_mappings,
    resolve_brand, seed_brand_aliases, start_job_run, update_brand_alias, CatalogItemFilters,
    CatalogWrite, DbError, ImageFields, MappingFields, StatusStore,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn image_write(brand: &str, article: &str, path: &str) -> CatalogWrite {
    CatalogWrite {
        brand: brand.to_string(),
        article: article.to_string(),
        image: Some(ImageFields {
            image_path: path.to_string(),
            content_sha256: "ab".repeat(32),
            byte_size: 3,
        }),
    }
}

fn mapping<'a>(brand: &'a str, article: &'a str) -> MappingFields<'a> {
    MappingFields {
        brand,
        article,
        description: None,
        brand_replace: "BOSCH",
        article_replace: "0 986",
        description_replace: None,
    }
}

async fn seed_resolver_fixture(pool: &sqlx::PgPool) {
    let brands = vec![
        BrandAliasConfig {
            canonical: "Bosch".to_string(),
            aliases: vec!["BSH".to_string(), "Robert Bosch".to_string()],
        },
        BrandAliasConfig {
            canonical: "Castrol".to_string(),
            aliases: vec!["Castrol Oil".to_string()],
        },
        BrandAliasConfig {
            canonical: "Foil Seal".to_string(),
            aliases: vec![],
        },
    ];
    seed_brand_aliases(pool, &brands)
        .await
        .expect("seed_brand_aliases failed");
}

// ---------------------------------------------------------------------------
// Section 1: Brand aliases and resolution
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn resolve_prefers_exact_canonical_match(pool: sqlx::PgPool) {
    seed_resolver_fixture(&pool).await;

    let matches = resolve_brand(&pool, "bosch").await.expect("resolve failed");
    assert_eq!(matches[0].canonical_brand, "Bosch");
    assert_eq!(matches[0].kind, MatchKind::Exact);
}

#[sqlx::test(migrations = "../../migrations")]
async fn resolve_matches_alias_tokens_at_either_end(pool: sqlx::PgPool) {
    seed_resolver_fixture(&pool).await;

    for query in ["bsh", "ROBERT BOSCH"] {
        let matches = resolve_brand(&pool, query).await.expect("resolve failed");
        assert_eq!(matches.len(), 1, "query {query}");
        assert_eq!(matches[0].canonical_brand, "Bosch");
        assert_eq!(matches[0].kind, MatchKind::AliasToken);
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn resolve_blank_query_matches_nothing(pool: sqlx::PgPool) {
    seed_resolver_fixture(&pool).await;

    let matches = resolve_brand(&pool, "   ").await.expect("resolve failed");
    assert!(matches.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn resolve_unknown_brand_matches_nothing(pool: sqlx::PgPool) {
    seed_resolver_fixture(&pool).await;

    let matches = resolve_brand(&pool, "mann").await.expect("resolve failed");
    assert!(matches.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn duplicate_canonical_is_unique_violation(pool: sqlx::PgPool) {
    create_brand_alias(&pool, "Bosch", &[])
        .await
        .expect("first insert failed");

    let err = create_brand_alias(&pool, "  BOSCH ", &[])
        .await
        .expect_err("duplicate canonical must fail");
    assert!(err.is_unique_violation(), "got {err:?}");
}

#[sqlx::test(migrations = "../../migrations")]
async fn alias_lists_are_cleaned_and_clearable(pool: sqlx::PgPool) {
    let aliases = vec![
        " BSH ".to_string(),
        String::new(),
        "bsh".to_string(),
        "Robert Bosch".to_string(),
    ];
    let row = create_brand_alias(&pool, "Bosch", &aliases)
        .await
        .expect("create failed");
    assert_eq!(row.alias_blob, "BSH | Robert Bosch");

    let updated = update_brand_alias(&pool, row.id, None, Some(&["Bosch AG".to_string()]))
        .await
        .expect("update failed");
    assert_eq!(updated.canonical_brand, "Bosch");
    assert_eq!(updated.aliases(), vec!["Bosch AG".to_string()]);

    let cleared = clear_brand_aliases(&pool, row.id)
        .await
        .expect("clear failed");
    assert!(cleared.aliases().is_empty());

    let fetched = get_brand_alias(&pool, row.id)
        .await
        .expect("get failed")
        .expect("row exists");
    assert_eq!(fetched.alias_blob, "");
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_unknown_alias_is_not_found(pool: sqlx::PgPool) {
    let err = update_brand_alias(&pool, 9_999, Some("X"), None)
        .await
        .expect_err("unknown id must fail");
    assert!(matches!(err, DbError::NotFound));
}

#[sqlx::test(migrations = "../../migrations")]
async fn seeding_twice_updates_in_place(pool: sqlx::PgPool) {
    seed_resolver_fixture(&pool).await;
    seed_resolver_fixture(&pool).await;

    let rows = list_brand_aliases(&pool, None).await.expect("list failed");
    assert_eq!(rows.len(), 3);

    let filtered = list_brand_aliases(&pool, Some("robert"))
        .await
        .expect("list failed");
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].canonical_brand, "Bosch");
}

// ---------------------------------------------------------------------------
// Section 2: Catalog items
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn catalog_upsert_creates_then_updates(pool: sqlx::PgPool) {
    let first = apply_catalog_writes(&pool, &[image_write("bosch", "ab1234", "bosch/ab1234.png")])
        .await
        .expect("first apply failed");
    assert!(first[0].created);
    assert!(first[0].previous_image_path.is_none());

    let second = apply_catalog_writes(&pool, &[image_write("bosch", "ab1234", "bosch/ab1234.jpg")])
        .await
        .expect("second apply failed");
    assert!(!second[0].created);
    assert_eq!(first[0].id, second[0].id);
    assert_eq!(
        second[0].previous_image_path.as_deref(),
        Some("bosch/ab1234.png")
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn payload_less_write_keeps_image_fields(pool: sqlx::PgPool) {
    apply_catalog_writes(&pool, &[image_write("bosch", "ab1234", "bosch/ab1234.png")])
        .await
        .expect("apply failed");

    let touch = CatalogWrite {
        brand: "bosch".to_string(),
        article: "ab1234".to_string(),
        image: None,
    };
    apply_catalog_writes(&pool, &[touch])
        .await
        .expect("touch failed");

    let (rows, total) = list_catalog_items(&pool, &CatalogItemFilters::default())
        .await
        .expect("list failed");
    assert_eq!(total, 1);
    assert_eq!(rows[0].image_path.as_deref(), Some("bosch/ab1234.png"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn same_key_twice_in_one_batch_is_one_record(pool: sqlx::PgPool) {
    let applied = apply_catalog_writes(
        &pool,
        &[
            image_write("bosch", "ab1234", "bosch/ab1234.png"),
            image_write("bosch", "ab1234", "bosch/ab1234.jpg"),
        ],
    )
    .await
    .expect("apply failed");

    assert!(applied[0].created);
    assert!(!applied[1].created);
    assert_eq!(
        applied[1].previous_image_path.as_deref(),
        Some("bosch/ab1234.png")
    );

    let (rows, total) = list_catalog_items(&pool, &CatalogItemFilters::default())
        .await
        .expect("list failed");
    assert_eq!(total, 1);
    assert_eq!(rows[0].image_path.as_deref(), Some("bosch/ab1234.jpg"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn prefix_lookup_treats_like_metacharacters_literally(pool: sqlx::PgPool) {
    apply_catalog_writes(
        &pool,
        &[
            image_write("bosch", "ab1234", "bosch/ab1234.png"),
            image_write("bosch", "ab12%x", "bosch/ab12%x.png"),
            image_write("mann", "ab1299", "mann/ab1299.png"),
        ],
    )
    .await
    .expect("apply failed");

    let hits = find_catalog_items_by_prefix(&pool, "bosch", "ab12")
        .await
        .expect("lookup failed");
    assert_eq!(hits.len(), 2);

    let literal = find_catalog_items_by_prefix(&pool, "bosch", "ab12%")
        .await
        .expect("lookup failed");
    assert_eq!(literal.len(), 1);
    assert_eq!(literal[0].article, "ab12%x");
}

#[sqlx::test(migrations = "../../migrations")]
async fn list_filters_and_pages(pool: sqlx::PgPool) {
    let writes: Vec<CatalogWrite> = (0..5)
        .map(|i| image_write("bosch", &format!("ab{i}"), &format!("bosch/ab{i}.png")))
        .chain(std::iter::once(image_write("mann", "zz1", "mann/zz1.png")))
        .collect();
    apply_catalog_writes(&pool, &writes)
        .await
        .expect("apply failed");

    let filters = CatalogItemFilters {
        brand: Some("BOS".to_string()),
        article: None,
        page: Some(2),
        per_page: Some(2),
    };
    let (rows, total) = list_catalog_items(&pool, &filters)
        .await
        .expect("list failed");
    assert_eq!(total, 5);
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.brand == "bosch"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn delete_unknown_item_is_not_found(pool: sqlx::PgPool) {
    let err = delete_catalog_item(&pool, 12_345)
        .await
        .expect_err("unknown id must fail");
    assert!(matches!(err, DbError::NotFound));
}

// ---------------------------------------------------------------------------
// Section 3: Integration groups and mappings
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn bulk_mappings_are_counted_and_paged(pool: sqlx::PgPool) {
    let group_id = create_group(&pool, "Autodoc", Some("feed rules"))
        .await
        .expect("create_group failed");

    let articles: Vec<String> = (0..35).map(|i| format!("a{i}")).collect();
    let rows: Vec<MappingFields<'_>> = articles.iter().map(|a| mapping("bosch", a)).collect();
    let inserted = bulk_create_mappings(&pool, group_id, &rows)
        .await
        .expect("bulk insert failed");
    assert_eq!(inserted, 35);

    let groups = list_groups(&pool).await.expect("list_groups failed");
    assert_eq!(groups[0].mapping_count, 35);

    let (page2, total) = list_mappings(&pool, group_id, Some(2), None)
        .await
        .expect("list_mappings failed");
    assert_eq!(total, 35);
    assert_eq!(page2.len(), 5);
}

#[sqlx::test(migrations = "../../migrations")]
async fn duplicate_mappings_are_allowed(pool: sqlx::PgPool) {
    let group_id = create_group(&pool, "Autodoc", None)
        .await
        .expect("create_group failed");

    bulk_create_mappings(&pool, group_id, &[mapping("bosch", "x"), mapping("bosch", "x")])
        .await
        .expect("duplicates must insert");

    let (_, total) = list_mappings(&pool, group_id, None, None)
        .await
        .expect("list_mappings failed");
    assert_eq!(total, 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn deleting_group_cascades_to_mappings(pool: sqlx::PgPool) {
    let group_id = create_group(&pool, "Autodoc", None)
        .await
        .expect("create_group failed");
    let row = create_mapping(&pool, group_id, mapping("bosch", "x"))
        .await
        .expect("create_mapping failed");

    delete_group(&pool, group_id).await.expect("delete failed");

    let gone = get_mapping(&pool, row.id).await.expect("get failed");
    assert!(gone.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn mapping_for_unknown_group_is_fk_violation(pool: sqlx::PgPool) {
    let err = create_mapping(&pool, 424_242, mapping("bosch", "x"))
        .await
        .expect_err("unknown group must fail");
    assert!(err.is_foreign_key_violation(), "got {err:?}");
}

// ---------------------------------------------------------------------------
// Section 4: Status store
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn status_store_upserts_and_lists_in_request_order(pool: sqlx::PgPool) {
    let store = StatusStore::new(pool);

    assert!(store.get("parser_status").await.expect("get failed").is_none());

    store.set("parser_status", "running").await.expect("set failed");
    let first = store.set("xml_update_status", "0").await.expect("set failed");
    let second = store.set("xml_update_status", "1").await.expect("set failed");
    assert_eq!(second.value, "1");
    assert!(second.updated_at >= first.updated_at);

    let entries = store
        .list(&["xml_update_status", "missing", "parser_status"])
        .await
        .expect("list failed");
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["xml_update_status", "parser_status"]);
}

// ---------------------------------------------------------------------------
// Section 5: Job runs
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn job_run_lifecycle_queued_to_succeeded(pool: sqlx::PgPool) {
    let run = create_job_run(&pool, "price_photo_update", "logs/price_photo_update.log")
        .await
        .expect("create failed");
    assert_eq!(run.status, "queued");

    start_job_run(&pool, run.id, Some(4242))
        .await
        .expect("start failed");
    finish_job_run(&pool, run.id, Some(0))
        .await
        .expect("finish failed");

    let fetched = get_job_run(&pool, run.public_id).await.expect("get failed");
    assert_eq!(fetched.status, "succeeded");
    assert_eq!(fetched.pid, Some(4242));
    assert_eq!(fetched.exit_code, Some(0));
    assert!(fetched.completed_at.is_some());
}

#[sqlx::test(migrations = "../../migrations")]
async fn nonzero_exit_marks_job_failed(pool: sqlx::PgPool) {
    let run = create_job_run(&pool, "trast_price_update", "logs/trast_price_update.log")
        .await
        .expect("create failed");
    start_job_run(&pool, run.id, Some(1))
        .await
        .expect("start failed");
    finish_job_run(&pool, run.id, Some(2))
        .await
        .expect("finish failed");

    let fetched = get_job_run(&pool, run.public_id).await.expect("get failed");
    assert_eq!(fetched.status, "failed");
    assert_eq!(fetched.exit_code, Some(2));
}

#[sqlx::test(migrations = "../../migrations")]
async fn finished_job_cannot_fail_again(pool: sqlx::PgPool) {
    let run = create_job_run(&pool, "trast_price_update", "logs/t.log")
        .await
        .expect("create failed");
    fail_job_run(&pool, run.id, "spawn failed")
        .await
        .expect("fail failed");

    let err = fail_job_run(&pool, run.id, "again")
        .await
        .expect_err("second fail must be rejected");
    assert!(matches!(err, DbError::InvalidJobRunTransition { .. }));

    let err = start_job_run(&pool, run.id, None)
        .await
        .expect_err("failed job cannot start");
    assert!(matches!(err, DbError::InvalidJobRunTransition { .. }));
}
