//! Incident list filtering.
//!
//! Four independent predicates combined with AND. An absent or empty
//! predicate matches everything, and filtering never reorders the list.

use serde::{Deserialize, Serialize};

use crate::incident::{Incident, format_timestamp};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentFilter {
  /// Case-insensitive substring of name, code or location.
  pub search: Option<String>,
  /// Exact type.
  #[serde(rename = "type")]
  pub kind:   Option<String>,
  /// Exact status.
  pub status: Option<String>,
  /// Prefix of the RFC 3339 rendering of `timestamp` or `occurrenceTime`,
  /// usually a calendar day such as `2024-05-01`.
  pub date:   Option<String>,
}

impl IncidentFilter {
  pub fn is_empty(&self) -> bool {
    [&self.search, &self.kind, &self.status, &self.date]
      .into_iter()
      .all(|p| active(p).is_none())
  }

  pub fn matches(&self, incident: &Incident) -> bool {
    let search = active(&self.search).is_none_or(|needle| {
      let needle = needle.to_lowercase();
      incident.name.to_lowercase().contains(&needle)
        || incident.code.as_str().to_lowercase().contains(&needle)
        || incident.location.to_lowercase().contains(&needle)
    });
    let kind = active(&self.kind).is_none_or(|k| incident.kind == k);
    let status = active(&self.status).is_none_or(|s| incident.status == s);
    let date = active(&self.date).is_none_or(|d| {
      format_timestamp(&incident.timestamp).starts_with(d)
        || format_timestamp(&incident.occurrence_time).starts_with(d)
    });
    search && kind && status && date
  }

  /// Keep the matching incidents, in their original order.
  pub fn apply(&self, incidents: Vec<Incident>) -> Vec<Incident> {
    if self.is_empty() {
      return incidents;
    }
    incidents.into_iter().filter(|i| self.matches(i)).collect()
  }
}

fn active(predicate: &Option<String>) -> Option<&str> {
  predicate.as_deref().filter(|p| !p.is_empty())
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};

  use super::*;
  use crate::memory::sample_incident;

  fn codes(list: &[Incident]) -> Vec<&str> { list.iter().map(|i| i.code.as_str()).collect() }

  fn fixture() -> Vec<Incident> {
    let mut a = sample_incident("111111", "Robo", "Pendiente");
    a.name = "Robo de celular".into();
    a.location = "Parque Kennedy".into();
    a.timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
    a.occurrence_time = Utc.with_ymd_and_hms(2024, 4, 30, 22, 0, 0).unwrap();

    let mut b = sample_incident("222222", "Robo", "Resuelta");
    b.name = "Asalto".into();
    b.location = "Jr. de la Unión".into();
    b.timestamp = Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap();
    b.occurrence_time = b.timestamp;

    let mut c = sample_incident("333333", "Incendio", "Pendiente");
    c.name = "Humo en edificio".into();
    c.location = "Av. Kennedy 200".into();
    c.timestamp = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
    c.occurrence_time = c.timestamp;

    vec![a, b, c]
  }

  #[test]
  fn type_and_status_example() {
    let list = vec![
      sample_incident("111111", "Robo", "Pendiente"),
      sample_incident("222222", "Robo", "Resuelta"),
    ];
    let filter = IncidentFilter {
      kind: Some("Robo".into()),
      status: Some("Pendiente".into()),
      ..Default::default()
    };
    assert_eq!(codes(&filter.apply(list)), ["111111"]);
  }

  #[test]
  fn empty_filter_matches_everything() {
    let filter = IncidentFilter { search: Some(String::new()), ..Default::default() };
    assert!(filter.is_empty());
    assert_eq!(codes(&filter.apply(fixture())), ["111111", "222222", "333333"]);
  }

  #[test]
  fn search_is_case_insensitive_over_name_code_location() {
    let by_location = IncidentFilter { search: Some("KENNEDY".into()), ..Default::default() };
    assert_eq!(codes(&by_location.apply(fixture())), ["111111", "333333"]);

    let by_code = IncidentFilter { search: Some("2222".into()), ..Default::default() };
    assert_eq!(codes(&by_code.apply(fixture())), ["222222"]);

    let by_name = IncidentFilter { search: Some("humo".into()), ..Default::default() };
    assert_eq!(codes(&by_name.apply(fixture())), ["333333"]);
  }

  #[test]
  fn date_matches_timestamp_or_occurrence() {
    let day = IncidentFilter { date: Some("2024-04-30".into()), ..Default::default() };
    assert_eq!(codes(&day.apply(fixture())), ["111111"]);

    let month = IncidentFilter { date: Some("2024-05".into()), ..Default::default() };
    assert_eq!(codes(&month.apply(fixture())), ["111111", "222222"]);
  }

  #[test]
  fn predicates_commute_and_are_idempotent() {
    let parts = [
      IncidentFilter { search: Some("kennedy".into()), ..Default::default() },
      IncidentFilter { kind: Some("Robo".into()), ..Default::default() },
      IncidentFilter { status: Some("Pendiente".into()), ..Default::default() },
      IncidentFilter { date: Some("2024-05".into()), ..Default::default() },
    ];
    let combined = IncidentFilter {
      search: parts[0].search.clone(),
      kind:   parts[1].kind.clone(),
      status: parts[2].status.clone(),
      date:   parts[3].date.clone(),
    };
    let all = fixture();
    let expected = combined.apply(all.clone());
    assert_eq!(codes(&expected), ["111111"]);

    let orders = [[0, 1, 2, 3], [3, 2, 1, 0], [2, 0, 3, 1], [1, 3, 0, 2]];
    for order in orders {
      let result = order.iter().fold(all.clone(), |acc, &i| parts[i].apply(acc));
      assert_eq!(result, expected, "order {order:?}");
    }
    assert_eq!(combined.apply(expected.clone()), expected);
  }

  #[test]
  fn fixtures_are_reproducible() {
    assert_eq!(fixture(), fixture());
  }
}
