//! Scenario tests: sessions over an in-memory SQLite store.

use chrono::NaiveDate;
use summit_core::{
  entity::{Ascent, EntityKind, HikeKind, Hiker, Peak, Range, Record, Region, Trip},
  store::NamePolicy,
};
use summit_store_sqlite::SqliteStore;

use crate::{
  Error,
  composite::CompositeTable,
  descriptor::ColumnDescriptor,
  filter::{ClassBuckets, Filter, Predicate},
  fold::Fold,
  layout::{LayoutFile, TableLayout},
  session::Session,
  stats::{self, Ranking},
  value::Value,
};

async fn session() -> Session<SqliteStore> {
  let store = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");
  Session::open(store).await.expect("session")
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
  NaiveDate::from_ymd_opt(y, m, d)
}

fn range(name: &str) -> Record {
  Record::Range(Range { id: 0, name: name.into(), continent: None })
}

fn region(name: &str, range_id: Option<i64>) -> Record {
  Record::Region(Region { id: 0, name: name.into(), range_id, country_id: None })
}

fn peak(name: &str, height: Option<i64>, region_id: Option<i64>) -> Record {
  Record::Peak(Peak {
    id: 0,
    name: name.into(),
    height,
    is_volcano: false,
    region_id,
    maps_link: None,
    earth_link: None,
    wiki_link: None,
  })
}

fn hiker(name: &str) -> Record { Record::Hiker(Hiker { id: 0, name: name.into() }) }

fn ascent(peak_id: Option<i64>, gain: Option<i64>) -> Ascent {
  Ascent {
    id:             0,
    title:          None,
    peak_id,
    date:           date(2023, 7, 14),
    time:           None,
    elevation_gain: gain,
    kind:           HikeKind::Normal,
    is_traverse:    false,
    difficulty:     None,
    trip_id:        None,
    description:    None,
  }
}

async fn add(s: &mut Session<SqliteStore>, record: Record) -> i64 {
  s.insert(record, NamePolicy::Reject).await.expect("insert")
}

fn cell(table: &CompositeTable, id: i64, column: &str) -> Value {
  let col = table.column_index(column).expect("column");
  table
    .visible_rows()
    .find(|r| r.id == id)
    .map(|r| r.cells[col].clone())
    .expect("row")
}

fn ids(table: &CompositeTable) -> Vec<i64> {
  table.visible_rows().map(|r| r.id).collect()
}

// ─── Folds ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn sum_of_gain_skips_unknown_gains() {
  let mut s = session().await;
  let p1 = add(&mut s, peak("Piz Palü", Some(3900), None)).await;
  let p2 = add(&mut s, peak("Niesen", Some(2362), None)).await;
  add(&mut s, Record::Ascent(ascent(Some(p1), Some(500)))).await;
  add(&mut s, Record::Ascent(ascent(Some(p1), None))).await;

  let peaks = s.table(EntityKind::Peak).await.unwrap();
  peaks
    .add_custom_column(
      ColumnDescriptor::new("Sum gain", EntityKind::Ascent, "elevation_gain")
        .folded(Fold::Sum),
    )
    .unwrap();

  assert_eq!(cell(peaks, p1, "Sum gain"), Value::Int(500));
  assert_eq!(cell(peaks, p2, "Sum gain"), Value::None);
  assert_eq!(cell(peaks, p1, "Num. ascents"), Value::Int(2));
  assert_eq!(cell(peaks, p2, "Num. ascents"), Value::Int(0));
}

#[tokio::test]
async fn numeric_folds_over_no_rows_are_empty_not_zero() {
  let mut s = session().await;
  let h = add(&mut s, hiker("Ada")).await;

  let hikers = s.table(EntityKind::Hiker).await.unwrap();
  for fold in [Fold::Average, Fold::Sum, Fold::Max, Fold::Min] {
    let name = format!("{fold} gain");
    hikers
      .add_custom_column(
        ColumnDescriptor::new(&name, EntityKind::Ascent, "elevation_gain")
          .folded(fold),
      )
      .unwrap();
    assert_eq!(cell(hikers, h, &name), Value::None, "{fold}");
  }
  assert_eq!(cell(hikers, h, "Total gain"), Value::None);
}

#[tokio::test]
async fn hiker_list_follows_participation() {
  let mut s = session().await;
  let p = add(&mut s, peak("Tödi", Some(3614), None)).await;
  let a = add(&mut s, Record::Ascent(ascent(Some(p), Some(1800)))).await;
  let hans = add(&mut s, hiker("Hans")).await;
  let ada = add(&mut s, hiker("Ada")).await;

  s.set_participants(a, vec![ada, hans]).await.unwrap();
  let ascents = s.table(EntityKind::Ascent).await.unwrap();
  assert_eq!(
    cell(ascents, a, "Hikers"),
    Value::List(vec![Value::text("Hans"), Value::text("Ada")])
  );

  s.set_participants(a, vec![ada]).await.unwrap();
  let ascents = s.table(EntityKind::Ascent).await.unwrap();
  assert_eq!(cell(ascents, a, "Hikers").to_string(), "Ada");

  let peaks = s.table(EntityKind::Peak).await.unwrap();
  assert_eq!(cell(peaks, p, "Hikers").to_string(), "Ada");
}

// ─── Live recomputation ──────────────────────────────────────────────────────

#[tokio::test]
async fn trip_view_follows_deletes_without_recreating_the_table() {
  let mut s = session().await;
  let t = add(
    &mut s,
    Record::Trip(Trip {
      id:          0,
      name:        "Bergell".into(),
      start_date:  date(2024, 8, 1),
      end_date:    date(2024, 8, 3),
      description: None,
    }),
  )
  .await;
  let mut first = ascent(None, Some(900));
  first.trip_id = Some(t);
  let first = add(&mut s, Record::Ascent(first)).await;
  let mut second = ascent(None, Some(1100));
  second.trip_id = Some(t);
  add(&mut s, Record::Ascent(second)).await;

  let trips = s.table(EntityKind::Trip).await.unwrap();
  trips
    .add_custom_column(
      ColumnDescriptor::new("Max gain", EntityKind::Ascent, "elevation_gain")
        .folded(Fold::Max),
    )
    .unwrap();
  assert_eq!(cell(trips, t, "Days"), Value::Int(3));
  assert_eq!(cell(trips, t, "Num. ascents"), Value::Int(2));
  assert_eq!(cell(trips, t, "Total gain"), Value::Int(2000));

  s.delete(EntityKind::Ascent, vec![first], false).await.unwrap();

  let trips = s.table(EntityKind::Trip).await.unwrap();
  assert_eq!(cell(trips, t, "Num. ascents"), Value::Int(1));
  assert_eq!(cell(trips, t, "Max gain"), Value::Int(1100));
}

#[tokio::test]
async fn identity_labels_follow_renamed_parents() {
  let mut s = session().await;
  let t = add(
    &mut s,
    Record::Trip(Trip {
      id:          0,
      name:        "Oberland".into(),
      start_date:  None,
      end_date:    None,
      description: None,
    }),
  )
  .await;
  let p = add(&mut s, peak("Eiger", Some(3967), None)).await;
  let mut climb = ascent(Some(p), None);
  climb.trip_id = Some(t);
  add(&mut s, Record::Ascent(climb)).await;

  let trips = s.table(EntityKind::Trip).await.unwrap();
  trips
    .add_custom_column(
      ColumnDescriptor::identity("Ascents", EntityKind::Ascent).folded(Fold::List),
    )
    .unwrap();
  assert_eq!(cell(trips, t, "Ascents").to_string(), "2023-07-14 Eiger");

  s.update(p, peak("Mönch", Some(4107), None), NamePolicy::Reject)
    .await
    .unwrap();

  let trips = s.table(EntityKind::Trip).await.unwrap();
  assert_eq!(cell(trips, t, "Ascents").to_string(), "2023-07-14 Mönch");
}

#[tokio::test]
async fn deleting_a_region_empties_the_peak_column() {
  let mut s = session().await;
  let r = add(&mut s, region("Berner Alpen", None)).await;
  let p = add(&mut s, peak("Eiger", Some(3967), Some(r))).await;

  let peaks = s.table(EntityKind::Peak).await.unwrap();
  assert_eq!(cell(peaks, p, "Region"), Value::text("Berner Alpen"));

  let preview = s.preview_delete(EntityKind::Region, vec![r]).await.unwrap();
  assert_eq!(preview.touched_kinds(), vec![EntityKind::Region, EntityKind::Peak]);
  assert!(s.delete(EntityKind::Region, vec![r], false).await.is_err());
  s.delete(EntityKind::Region, vec![r], true).await.unwrap();

  let peaks = s.table(EntityKind::Peak).await.unwrap();
  assert_eq!(ids(peaks), vec![p]);
  assert_eq!(cell(peaks, p, "Region"), Value::None);
}

#[tokio::test]
async fn tables_keep_their_state_across_mutations() {
  let mut s = session().await;
  add(&mut s, Record::Country(summit_core::entity::Country {
    id:   0,
    name: "Schweiz".into(),
  }))
  .await;
  let countries = s.table(EntityKind::Country).await.unwrap();
  countries.set_hidden(0, true).unwrap();

  add(&mut s, hiker("Ada")).await;
  let countries = s.table(EntityKind::Country).await.unwrap();
  assert!(countries.column_meta()[0].hidden);
  assert_eq!(countries.row_count(), 1);
}

#[tokio::test]
async fn batch_update_reports_each_row() {
  let mut s = session().await;
  let a = add(&mut s, hiker("Ada")).await;
  let b = add(&mut s, hiker("Bea")).await;

  let results = s
    .update_batch(
      vec![
        (a, Record::Hiker(Hiker { id: a, name: "Ada L.".into() })),
        (b, Record::Hiker(Hiker { id: b, name: " ".into() })),
        (99, Record::Hiker(Hiker { id: 99, name: "Nobody".into() })),
      ],
      NamePolicy::Reject,
    )
    .await;
  assert!(results[0].is_ok());
  assert!(matches!(results[1], Err(Error::Store(_))));
  assert!(results[2].is_err());

  let hikers = s.table(EntityKind::Hiker).await.unwrap();
  assert_eq!(cell(hikers, a, "Name"), Value::text("Ada L."));
  assert_eq!(cell(hikers, b, "Name"), Value::text("Bea"));
}

// ─── Filters ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn text_filter_matches_folded_region_list() {
  let mut s = session().await;
  let alps = add(&mut s, range("Seealpen-Kette")).await;
  let jura = add(&mut s, range("Jura")).await;
  add(&mut s, region("Gipfelgruppe", Some(alps))).await;
  add(&mut s, region("Seealpen", Some(alps))).await;
  add(&mut s, region("Waadtländer Jura", Some(jura))).await;

  let ranges = s.table(EntityKind::Range).await.unwrap();
  ranges
    .add_custom_column(
      ColumnDescriptor::new("Region", EntityKind::Region, "name").folded(Fold::List),
    )
    .unwrap();
  assert_eq!(
    cell(ranges, alps, "Region").to_string(),
    "Gipfelgruppe, Seealpen"
  );

  ranges
    .add_filter(Filter::new("Region", Predicate::Text { needle: "gipf".into() }))
    .unwrap();
  assert_eq!(ids(ranges), vec![alps]);
}

#[tokio::test]
async fn removing_a_column_deactivates_its_filter() {
  let mut s = session().await;
  add(&mut s, peak("Säntis", Some(2502), None)).await;
  add(&mut s, peak("Rigi", Some(1797), None)).await;

  let peaks = s.table(EntityKind::Peak).await.unwrap();
  let col = peaks
    .add_custom_column(ColumnDescriptor::new("Alt", EntityKind::Peak, "height"))
    .unwrap();
  let f = peaks
    .add_filter(Filter::new("Alt", Predicate::IntExact { value: 2502 }))
    .unwrap();
  assert_eq!(peaks.row_count(), 1);

  peaks.remove_column(col).unwrap();
  assert!(!peaks.filters()[f].active);
  assert_eq!(peaks.row_count(), 2);
  assert!(matches!(
    peaks.set_filter_active(f, true),
    Err(Error::UnknownColumn(_))
  ));
}

#[tokio::test]
async fn class_boundary_lands_in_the_upper_class() {
  let mut s = session().await;
  let low = add(&mut s, peak("Pilatus", Some(2999), None)).await;
  let edge = add(&mut s, peak("Piz Kesch", Some(3000), None)).await;
  let high = add(&mut s, peak("Dom", Some(4545), None)).await;

  let peaks = s.table(EntityKind::Peak).await.unwrap();
  let buckets = ClassBuckets::new(1000, 1000, 4000).unwrap();
  peaks
    .add_filter(Filter::new("Height", Predicate::IntClass { buckets, low: 3000 }))
    .unwrap();
  // 4545 is above the ceiling and clipped into the top class.
  assert_eq!(ids(peaks), vec![edge, high]);
  assert!(!ids(peaks).contains(&low));
}

#[tokio::test]
async fn identity_filter_uses_distinct_values() {
  let mut s = session().await;
  let p = add(&mut s, peak("Tödi", None, None)).await;
  let a1 = add(&mut s, Record::Ascent(ascent(Some(p), None))).await;
  let a2 = add(&mut s, Record::Ascent(ascent(Some(p), None))).await;
  let ada = add(&mut s, hiker("Ada")).await;
  let hans = add(&mut s, hiker("Hans")).await;
  s.set_participants(a1, vec![ada, hans]).await.unwrap();
  s.set_participants(a2, vec![hans]).await.unwrap();

  let ascents = s.table(EntityKind::Ascent).await.unwrap();
  let hikers = ascents.column_index("Hikers").unwrap();
  assert_eq!(ascents.distinct_values(hikers).unwrap(), vec![
    Value::text("Ada"),
    Value::text("Hans")
  ]);

  ascents
    .add_filter(Filter::new("Hikers", Predicate::Identity { value: "Ada".into() }))
    .unwrap();
  assert_eq!(ids(ascents), vec![a1]);
}

// ─── Sorting ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn sort_is_stable_and_reversible() {
  let mut s = session().await;
  let mut made = Vec::new();
  for d in [date(2023, 7, 14), None, date(2023, 7, 14), date(2022, 1, 1)] {
    let mut a = ascent(None, None);
    a.date = d;
    made.push(add(&mut s, Record::Ascent(a)).await);
  }
  let &[a1, a2, a3, a4] = made.as_slice() else { unreachable!() };

  let ascents = s.table(EntityKind::Ascent).await.unwrap();
  let col = ascents.column_index("Date").unwrap();

  ascents.sort(col, true).unwrap();
  let once = ids(ascents);
  ascents.sort(col, true).unwrap();
  assert_eq!(ids(ascents), once);
  assert_eq!(once, vec![a4, a1, a3, a2]);

  ascents.sort(col, false).unwrap();
  assert_eq!(ids(ascents), vec![a1, a3, a4, a2]);

  ascents.clear_sort();
  assert_eq!(ids(ascents), vec![a1, a2, a3, a4]);
}

// ─── Descriptors & layouts ───────────────────────────────────────────────────

#[tokio::test]
async fn descriptor_survives_serialisation() {
  let mut s = session().await;
  let p = add(&mut s, peak("Bernina", Some(4049), None)).await;
  add(&mut s, Record::Ascent(ascent(Some(p), Some(1600)))).await;
  add(&mut s, Record::Ascent(ascent(Some(p), Some(1700)))).await;

  let descriptor =
    ColumnDescriptor::new("Avg gain", EntityKind::Ascent, "elevation_gain")
      .folded(Fold::Average)
      .with_suffix(" m");
  let json = serde_json::to_string(&descriptor).unwrap();
  let back: ColumnDescriptor = serde_json::from_str(&json).unwrap();

  let graph = s.graph().clone();
  assert_eq!(
    back.resolve(&graph, EntityKind::Peak).unwrap(),
    descriptor.resolve(&graph, EntityKind::Peak).unwrap()
  );

  let peaks = s.table(EntityKind::Peak).await.unwrap();
  peaks.add_custom_column(descriptor).unwrap();
  let first = cell(peaks, p, "Avg gain");
  peaks
    .remove_column(peaks.column_index("Avg gain").unwrap())
    .unwrap();
  peaks.add_custom_column(back).unwrap();
  assert_eq!(cell(peaks, p, "Avg gain"), first);
  assert_eq!(first, Value::Float(1650.0));
}

#[tokio::test]
async fn stored_layouts_are_reapplied_with_warnings() {
  let mut s = session().await;
  add(&mut s, peak("Säntis", Some(2502), None)).await;

  let mut layout = TableLayout::new(EntityKind::Peak);
  layout.columns.push(
    ColumnDescriptor::new("Gain", EntityKind::Ascent, "elevation_gain").folded(Fold::Sum),
  );
  layout.columns.push(ColumnDescriptor::new("Broken", EntityKind::Peak, "altitude"));
  layout.filters.push(Filter::new("Gone", Predicate::Bool { value: true }));
  let file = LayoutFile { tables: vec![layout] };

  let warnings = s.apply_layouts(&file).await.unwrap();
  assert_eq!(warnings.len(), 2);
  assert_eq!(warnings[0].item, "Broken");

  let saved = s.layouts();
  assert_eq!(saved.tables.len(), 1);
  assert_eq!(saved.tables[0].columns.len(), 1);
  assert!(saved.tables[0].filters.is_empty());
}

// ─── Statistics ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn yearly_series_counts_undated_rows_separately() {
  let mut s = session().await;
  for (d, gain) in [
    (date(2022, 3, 1), Some(800)),
    (date(2023, 7, 14), Some(1200)),
    (date(2023, 9, 2), None),
    (None, Some(400)),
  ] {
    let mut a = ascent(None, gain);
    a.date = d;
    add(&mut s, Record::Ascent(a)).await;
  }

  let ascents = s.table(EntityKind::Ascent).await.unwrap();
  let date_col = ascents.column_index("Date").unwrap();
  let gain_col = ascents.column_index("Elevation gain").unwrap();
  ascents.set_hidden(gain_col, true).unwrap();
  let snap = ascents.snapshot_with_hidden();

  let series = stats::per_year(&snap, date_col, Some(gain_col)).unwrap();
  assert_eq!(series.unknown, 1);
  assert_eq!(series.years[&2022].rows, 1);
  assert_eq!(series.years[&2023].rows, 2);
  assert_eq!(series.years[&2023].sum, Some(1200.0));

  let hist = stats::histogram(&snap, gain_col, 500).unwrap();
  assert_eq!(hist.missing, 1);
  assert_eq!(hist.buckets[&0], 1);
  assert_eq!(hist.buckets[&500], 1);
  assert_eq!(hist.buckets[&1000], 1);

  assert!(matches!(
    stats::per_year(&snap, gain_col, None),
    Err(Error::TypeMismatch { .. })
  ));
}

#[tokio::test]
async fn paired_series_is_date_ordered() {
  let mut s = session().await;
  let high = add(&mut s, peak("Weissmies", Some(4017), None)).await;
  let low = add(&mut s, peak("Chasseral", Some(1606), None)).await;
  let mut late = ascent(Some(low), Some(300));
  late.date = date(2024, 5, 1);
  let late = add(&mut s, Record::Ascent(late)).await;
  let mut early = ascent(Some(high), Some(1300));
  early.date = date(2021, 8, 20);
  let early = add(&mut s, Record::Ascent(early)).await;

  let ascents = s.table(EntityKind::Ascent).await.unwrap();
  let points = stats::paired_series(
    &ascents.snapshot_with_hidden(),
    ascents.column_index("Date").unwrap(),
    ascents.column_index("Elevation gain").unwrap(),
    ascents.column_index("Height").unwrap(),
  )
  .unwrap();
  let order: Vec<_> = points.iter().map(|p| (p.id, p.b)).collect();
  assert_eq!(order, vec![
    (Some(early), Some(4017.0)),
    (Some(late), Some(1606.0))
  ]);
}

#[tokio::test]
async fn top_n_returns_what_exists() {
  let mut s = session().await;
  let a = add(&mut s, peak("Finsteraarhorn", Some(4274), None)).await;
  let b = add(&mut s, peak("Aletschhorn", Some(4193), None)).await;
  add(&mut s, peak("Namenlos", None, None)).await;
  let c = add(&mut s, peak("Schreckhorn", Some(4193), None)).await;

  let peaks = s.table(EntityKind::Peak).await.unwrap();
  let height = peaks.column_index("Height").unwrap();
  let snap = peaks.snapshot_with_hidden();

  let top = stats::top_n(&snap, height, 10, Ranking::Highest).unwrap();
  let order: Vec<_> = top.iter().map(|r| r.id).collect();
  assert_eq!(order, vec![Some(a), Some(b), Some(c)]);

  let bottom = stats::top_n(&snap, height, 1, Ranking::Lowest).unwrap();
  assert_eq!(bottom[0].id, Some(b));
}

// ─── Export snapshot ─────────────────────────────────────────────────────────

#[tokio::test]
async fn snapshot_follows_the_view_and_raw_follows_the_store() {
  let mut s = session().await;
  add(&mut s, hiker("Ada")).await;
  let b = add(&mut s, hiker("Bea")).await;

  let hikers = s.table(EntityKind::Hiker).await.unwrap();
  hikers
    .add_filter(Filter::new("Name", Predicate::Text { needle: "be".into() }))
    .unwrap();
  hikers.set_hidden(1, true).unwrap();
  let snap = hikers.snapshot();
  assert_eq!(snap.rows.len(), 1);
  assert_eq!(snap.rows[0].id, Some(b));
  assert_eq!(snap.columns.len(), hikers.columns().len() - 1);
  assert!(snap.columns.iter().all(|c| c.name != "Num. ascents"));

  let raw = s.raw_snapshot(EntityKind::Hiker).await.unwrap();
  assert_eq!(raw.rows.len(), 2);
  assert_eq!(
    raw.columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
    vec!["id", "name"]
  );
}
