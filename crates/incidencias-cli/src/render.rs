//! Plain-text rendering of incidents and dashboards for the terminal.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use incidencias_core::{
  dashboard::{Bucket, Dashboard},
  incident::Incident,
};
use unicode_width::{UnicodeWidthChar as _, UnicodeWidthStr as _};

const KIND_WIDTH: usize = 16;
const STATUS_WIDTH: usize = 10;
const NAME_WIDTH: usize = 28;
const LOCATION_WIDTH: usize = 24;

fn short_time(t: &DateTime<Utc>) -> String { t.format("%Y-%m-%d %H:%M").to_string() }

/// Cut `s` to at most `width` terminal columns, marking the cut with `…`.
fn clip(s: &str, width: usize) -> String {
  if s.width() <= width {
    return s.to_string();
  }
  let mut out = String::new();
  let mut used = 0;
  for c in s.chars() {
    let w = c.width().unwrap_or(0);
    if used + w + 1 > width {
      break;
    }
    out.push(c);
    used += w;
  }
  out.push('…');
  out
}

/// [`clip`] and pad with spaces to exactly `width` columns.
fn cell(s: &str, width: usize) -> String {
  let mut out = clip(s, width);
  let fill = width.saturating_sub(out.width());
  out.extend(std::iter::repeat_n(' ', fill));
  out
}

/// One line per incident, newest first as given.
pub fn incident_table(incidents: &[Incident]) -> String {
  if incidents.is_empty() {
    return "no incidents\n".to_string();
  }
  let mut out = String::new();
  let _ = writeln!(
    out,
    "{:<6}  {:<16}  {}  {}  {}  LOCATION",
    "CODE",
    "REPORTED",
    cell("TYPE", KIND_WIDTH),
    cell("STATUS", STATUS_WIDTH),
    cell("NAME", NAME_WIDTH),
  );
  for i in incidents {
    let _ = writeln!(
      out,
      "{:<6}  {:<16}  {}  {}  {}  {}",
      i.code,
      short_time(&i.timestamp),
      cell(&i.kind, KIND_WIDTH),
      cell(&i.status, STATUS_WIDTH),
      cell(&i.name, NAME_WIDTH),
      clip(&i.location, LOCATION_WIDTH),
    );
  }
  out
}

/// Every field of one incident. `base_url` turns the photo path into a link.
pub fn incident_detail(i: &Incident, base_url: &str) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "{} · {}", i.code, i.name);
  let _ = writeln!(out, "  type:        {}", i.kind);
  let _ = writeln!(out, "  status:      {}", i.status);
  let _ = writeln!(out, "  location:    {}", i.location);
  if let (Some(lat), Some(lng)) = (i.lat, i.lng) {
    let _ = writeln!(out, "  coordinates: {lat:.6}, {lng:.6}");
  }
  let _ = writeln!(out, "  reported by: {}", i.reported_by);
  let _ = writeln!(out, "  reported:    {}", short_time(&i.timestamp));
  let _ = writeln!(out, "  occurred:    {}", short_time(&i.occurrence_time));
  if let Some(by) = &i.posted_by {
    let _ = writeln!(out, "  posted by:   {} ({})", by.name, by.username);
  }
  if let Some(url) = &i.image_url {
    let _ = writeln!(out, "  photo:       {base_url}{url}");
  }
  if let Some(desc) = i.description.as_deref().filter(|d| !d.is_empty()) {
    let _ = writeln!(out, "\n  {desc}");
  }
  out
}

fn buckets(out: &mut String, title: &str, buckets: &[Bucket], total: usize) {
  let _ = writeln!(out, "{title}");
  let width = buckets.iter().map(|b| b.key.width()).max().unwrap_or(0);
  for b in buckets {
    let pct = if total == 0 { 0.0 } else { b.count as f64 * 100.0 / total as f64 };
    let _ = writeln!(out, "  {}  {:>4}  {:>5.1}%", cell(&b.key, width), b.count, pct);
  }
}

pub fn dashboard(d: &Dashboard) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "total incidents: {}\n", d.total);
  buckets(&mut out, "by type", &d.by_type, d.total);
  out.push('\n');
  buckets(&mut out, "by status", &d.by_status, d.total);
  out
}
