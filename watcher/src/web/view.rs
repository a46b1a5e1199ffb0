use birdnestcore::model::Violation;
use chrono::SecondsFormat;

fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Table rows for the snapshot, newest first. Single line so it fits one SSE data field.
pub fn render_rows(snapshot: &[Violation]) -> String {
    if snapshot.is_empty() {
        return r#"<tr><td colspan="5">No violations in the retention window</td></tr>"#.to_string();
    }
    snapshot
        .iter()
        .map(|violation| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.1} m</td><td>{}</td></tr>",
                escape(&violation.pilot.full_name()),
                escape(&violation.pilot.email),
                escape(&violation.pilot.phone_number),
                violation.closest_distance_m,
                violation
                    .last_touched
                    .to_rfc3339_opts(SecondsFormat::Secs, true)
            )
        })
        .collect()
}

pub fn render_page(rows: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Birdnest no-fly-zone violations</title>
</head>
<body>
<h1>Pilots who recently violated the no-fly zone</h1>
<table>
<thead><tr><th>Pilot</th><th>Email</th><th>Phone</th><th>Closest distance</th><th>Last seen</th></tr></thead>
<tbody id="violations">{}</tbody>
</table>
<script>
new EventSource("/events").onmessage = (event) => {{
  document.getElementById("violations").innerHTML = event.data;
}};
</script>
</body>
</html>
"#,
        rows
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use birdnestcore::model::Pilot;
    use chrono::{TimeZone, Utc};

    fn violation(first_name: &str, distance_m: f64) -> Violation {
        let at = Utc.with_ymd_and_hms(2022, 12, 9, 10, 18, 37).unwrap();
        Violation::first_sighting(
            "SN-1",
            Pilot {
                pilot_id: "P-1".into(),
                first_name: first_name.into(),
                last_name: "Tester".into(),
                phone_number: "+123".into(),
                email: "bob@email.com".into(),
                created_dt: at,
            },
            distance_m,
            at,
        )
    }

    #[test]
    fn rows_render_pilot_details() {
        let rows = render_rows(&[violation("Bob", 42.345)]);
        assert!(rows.contains("<td>Bob Tester</td>"));
        assert!(rows.contains("<td>42.3 m</td>"));
        assert!(rows.contains("2022-12-09T10:18:37Z"));
        assert!(!rows.contains('\n'));
    }

    #[test]
    fn rows_escape_markup() {
        let rows = render_rows(&[violation("<script>", 1.0)]);
        assert!(rows.contains("&lt;script&gt;"));
        assert!(!rows.contains("<script>"));
    }

    #[test]
    fn identical_snapshots_render_identically() {
        let snapshot = vec![violation("Bob", 10.0), violation("Billy", 20.0)];
        assert_eq!(render_rows(&snapshot), render_rows(&snapshot.clone()));
    }

    #[test]
    fn empty_snapshot_has_placeholder_row() {
        let page = render_page(&render_rows(&[]));
        assert!(page.contains("No violations in the retention window"));
        assert!(page.contains("EventSource"));
    }
}
