use chrono::{DateTime, Utc};
use url::form_urlencoded;

pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(max_chars - 1).collect();
    out.push('…');
    out
}

pub fn path_segment(s: &str) -> String {
    form_urlencoded::byte_serialize(s.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

pub fn human_time(t: Option<DateTime<Utc>>) -> String {
    let t = match t {
        Some(t) => t,
        None => return "never".to_string(),
    };

    let d = Utc::now() - t;
    let secs = d.num_seconds();

    if secs < 60 {
        "just now".to_string()
    } else if secs < 3600 {
        let m = d.num_minutes();
        if m == 1 {
            "1 minute ago".to_string()
        } else {
            format!("{} minutes ago", m)
        }
    } else if secs < 86400 {
        let h = d.num_hours();
        if h == 1 {
            "1 hour ago".to_string()
        } else {
            format!("{} hours ago", h)
        }
    } else {
        t.format("%b %e, %Y %H:%M").to_string()
    }
}
