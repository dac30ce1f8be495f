use edge_storage::sql;
use edge_storage::ErrorKind;

#[test]
fn insert_numbers_placeholders_per_column() {
    assert_eq!(
        sql::insert("core_data.event", &["id", "device_info_id", "origin"]),
        "INSERT INTO core_data.event(id, device_info_id, origin) VALUES ($1, $2, $3)"
    );
    assert_eq!(
        sql::insert_or_ignore("t", &["id", "content"]),
        "INSERT INTO t(id, content) VALUES ($1, $2) ON CONFLICT DO NOTHING"
    );
}

#[test]
fn paginated_select_continues_numbering_after_filters() {
    assert_eq!(
        sql::select_where_paginated("v", &["id", "origin"], "origin", &["devicename"]),
        "SELECT id, origin FROM v WHERE devicename = $1 ORDER BY origin DESC OFFSET $2 LIMIT $3"
    );
    assert_eq!(
        sql::select_where_paginated("v", &["id"], "origin", &[]),
        "SELECT id FROM v ORDER BY origin DESC OFFSET $1 LIMIT $2"
    );
}

#[test]
fn time_range_reserves_first_two_parameters() {
    let statement = sql::select_by_time_range_paginated(
        "v",
        &["id"],
        "origin",
        "origin",
        &["resourcename"],
        &["devicename", "resourcename"],
    );
    assert_eq!(
        statement,
        "SELECT id FROM v WHERE origin >= $1 AND origin <= $2 AND devicename = $3 \
         AND resourcename = ANY ($4) ORDER BY origin DESC OFFSET $5 LIMIT $6"
    );
}

#[test]
fn update_puts_condition_after_assignments() {
    assert_eq!(
        sql::update_cols_by_col("t", "name", &["content"]),
        "UPDATE t SET content = $1 WHERE name = $2"
    );
    assert_eq!(
        sql::update_content_by_json("t"),
        "UPDATE t SET content = $1 WHERE content @> $2::jsonb"
    );
}

#[test]
fn document_queries_order_by_content_created() {
    assert_eq!(
        sql::content_by_json_paginated("t"),
        format!(
            "SELECT content FROM t WHERE content @> $1::jsonb ORDER BY {} OFFSET $2 LIMIT $3",
            sql::CONTENT_CREATED
        )
    );
}

#[test]
fn delete_like_returns_requested_columns() {
    assert_eq!(
        sql::delete_by_like_returning("core_keeper.config", "key", &["key"]),
        "DELETE FROM core_keeper.config WHERE key LIKE $1 ESCAPE '\\' RETURNING key"
    );
    assert_eq!(
        sql::delete_by_like_returning("t", "key", &[]),
        "DELETE FROM t WHERE key LIKE $1 ESCAPE '\\'"
    );
}

#[test]
fn negative_limit_means_unbounded() {
    assert_eq!(sql::normalize_pagination(5, -1), (5, None));
    assert_eq!(sql::normalize_pagination(-3, 10), (0, Some(10)));
}

#[test]
fn inverted_time_range_is_rejected() {
    let err = sql::validate_time_range(10, 5).expect_err("inverted range");
    assert_eq!(err.kind(), ErrorKind::ContractInvalid);
    sql::validate_time_range(5, 5).expect("equal bounds");
}
