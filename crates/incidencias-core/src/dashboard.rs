//! Dashboard aggregation: how many incidents per type and per status.

use serde::{Deserialize, Serialize};

use crate::incident::Incident;

/// One row of a frequency table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
  pub key:   String,
  pub count: usize,
}

/// Frequency tables over an incident list. Keys appear in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
  pub total:     usize,
  pub by_type:   Vec<Bucket>,
  pub by_status: Vec<Bucket>,
}

impl Dashboard {
  pub fn from_incidents<'a>(incidents: impl IntoIterator<Item = &'a Incident>) -> Self {
    let mut dashboard = Dashboard::default();
    for incident in incidents {
      dashboard.total += 1;
      bump(&mut dashboard.by_type, &incident.kind);
      bump(&mut dashboard.by_status, &incident.status);
    }
    dashboard
  }
}

fn bump(buckets: &mut Vec<Bucket>, key: &str) {
  match buckets.iter_mut().find(|b| b.key == key) {
    Some(bucket) => bucket.count += 1,
    None => buckets.push(Bucket { key: key.to_owned(), count: 1 }),
  }
}
