use packmsg::{
  BoxError, ChangeRow, Column, Constant, Error, Image, Message, Record, RowData, Sheet, SqlKind, Transaction, Value,
};

fn users_update() -> Transaction {
  Transaction::new("6f1d2c7e-0b3a-11ee-be56:1042", "mysql-bin.000012:88213")
    .with_batch_number(2)
    .with_times(1_686_000_000_500, 1_686_000_000_750)
    .with_sheet(
      Sheet::new("shop", "users", SqlKind::Update)
        .with_times(1_686_000_000_500, 1_686_000_000_750)
        .with_columns(vec![
          Column::new("email", "varchar(255)", true),
          Column::new("id", "bigint", false),
        ])
        .with_primary_keys(["id"])
        .with_rows(vec![ChangeRow::update(
          RowData::new(vec![Value::from("a@b.com"), Value::I64(5)]),
          RowData::new(vec![Value::from("c@d.com"), Value::I64(5)]),
        )]),
    )
}

#[test]
fn test_constant_redacts_both_images() {
  let mut transaction = users_update();
  transaction.index_rows().unwrap();
  transaction.transform(&Constant::new("email", "REDACTED")).unwrap();

  let sheet = &transaction.sheets()[0];
  assert_eq!(sheet.columns().len(), 2);
  let change = &sheet.rows()[0];
  assert_eq!(change.before().unwrap().values, vec![Value::from("REDACTED"), Value::I64(5)]);
  assert_eq!(change.after().unwrap().values, vec![Value::from("REDACTED"), Value::I64(5)]);

  let record = sheet.record(0, Image::After).unwrap().unwrap();
  assert_eq!(record["email"], Value::from("REDACTED"));
  assert_eq!(record["id"], Value::I64(5));
}

#[test]
fn test_keyed_view_round_trips_unchanged() {
  let mut transaction = users_update();
  let original = transaction.sheets()[0].rows().to_vec();

  let identity = |record: &Record| -> Result<Record, BoxError> { Ok(record.clone()) };
  transaction.transform(&identity).unwrap();

  let sheet = &transaction.sheets()[0];
  assert_eq!(sheet.rows(), original.as_slice());
  assert_eq!(sheet.columns().len(), 2);
}

#[test]
fn test_schema_drift_appends_generated_column() {
  let mut transaction = users_update();
  let tag = |record: &Record| -> Result<Record, BoxError> {
    let mut changed = Record::new();
    if let Some(Value::String(email)) = record.get("email") {
      changed.insert("email_domain".to_string(), Value::from(email.split('@').nth(1)));
    }
    Ok(changed)
  };
  transaction.transform(&tag).unwrap();

  let sheet = &transaction.sheets()[0];
  let names = sheet.columns().iter().map(|c| c.name.as_str()).collect::<Vec<_>>();
  assert_eq!(names, vec!["email", "id", "email_domain"]);
  assert!(sheet.columns()[2].is_generated());
  assert_eq!(sheet.rows()[0].before().unwrap().values[2], Value::from("b.com"));
  assert_eq!(sheet.rows()[0].after().unwrap().values[2], Value::from("d.com"));

  // running again neither duplicates nor reorders columns
  transaction.transform(&tag).unwrap();
  assert_eq!(transaction.sheets()[0].columns().len(), 3);
  transaction.index_rows().unwrap();
}

#[test]
fn test_transform_error_reports_location() {
  let mut transaction = users_update();
  let refuse = |_: &Record| -> Result<Record, BoxError> { Err("masking service unavailable".into()) };

  let err = transaction.transform(&refuse).unwrap_err();
  assert!(matches!(err, Error::Transform { row: 0, .. }));
  assert_eq!(
    err.to_string(),
    "transform failed on shop.users row 0: masking service unavailable"
  );
}

#[test]
fn test_primary_keys_follow_transformed_values() {
  let mut transaction = users_update();
  transaction.transform(&Constant::new("id", Value::I64(0))).unwrap();
  transaction.fill_primary_keys();
  assert_eq!(
    transaction.sheets()[0].rows()[0].before().unwrap().pk_values,
    vec![Value::I64(0)]
  );
}

#[test]
fn test_masked_primary_key_reaches_pack_output() {
  let line = r#"{"cp":"mysql-bin.000012:88213","xid":"gtid:9","bn":1,"ts":[{"db":"shop","tbl":"users","st":1,"cols":[{"name":"id","type":"bigint"},{"name":"email","type":"varchar(255)","nullable":true}],"PKNames":["id"],"rows":[{"after":{"vals":[7,"a@b.com"]}}]}]}"#;
  let mut transaction: Transaction = serde_json::from_str(line).unwrap();
  transaction.index_rows().unwrap();
  transaction.transform(&"id=0".parse::<Constant>().unwrap()).unwrap();
  transaction.fill_primary_keys();

  let after = transaction.sheets()[0].rows()[0].after().unwrap();
  assert_eq!(after.pk_values, vec![Value::I64(0)]);
  let pack = String::from_utf8(transaction.bytes().unwrap().to_vec()).unwrap();
  assert!(pack.contains(r#""pk_vals":[0],"vals":[0,"a@b.com"]"#));
}
