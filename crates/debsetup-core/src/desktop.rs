use crate::profile::PackageProfile;

pub fn render_desktop_entry(profile: &PackageProfile) -> String {
    let mut desktop = String::new();
    desktop.push_str("[Desktop Entry]\n");
    desktop.push_str("Type=Application\n");
    desktop.push_str(&format!(
        "Name={}\n",
        sanitize_desktop_value(&profile.display_name)
    ));
    if let Some(comment) = &profile.comment {
        let comment = sanitize_desktop_value(comment);
        if !comment.is_empty() {
            desktop.push_str(&format!("Comment={comment}\n"));
        }
    }
    desktop.push_str(&format!(
        "Exec=\"{}\"\n",
        quote_exec_argument(&sanitize_desktop_value(&profile.exec_path))
    ));
    if let Some(icon) = &profile.icon {
        desktop.push_str(&format!("Icon={}\n", sanitize_desktop_value(icon)));
    }
    desktop.push_str("Terminal=false\n");
    let categories = profile
        .categories
        .iter()
        .map(|category| sanitize_desktop_list_token(category))
        .filter(|category| !category.is_empty())
        .collect::<Vec<_>>();
    if !categories.is_empty() {
        desktop.push_str(&format!("Categories={};\n", categories.join(";")));
    }
    desktop.push_str("X-GNOME-Autostart-enabled=true\n");
    desktop
}

pub(crate) fn sanitize_desktop_value(value: &str) -> String {
    value
        .chars()
        .map(|ch| if ch == '\n' || ch == '\r' { ' ' } else { ch })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Escapes a value for a double-quoted `Exec` argument. The result goes
/// through the string escape pass too, so a literal backslash ends up as four.
pub(crate) fn quote_exec_argument(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '"' | '`' | '$' => {
                quoted.push_str("\\\\");
                quoted.push(ch);
            }
            '\\' => quoted.push_str("\\\\\\\\"),
            '%' => quoted.push_str("%%"),
            _ => quoted.push(ch),
        }
    }
    quoted
}

pub(crate) fn sanitize_desktop_list_token(value: &str) -> String {
    value
        .chars()
        .map(|ch| {
            if ch == '\n' || ch == '\r' || ch == ';' {
                '_'
            } else {
                ch
            }
        })
        .collect::<String>()
        .trim()
        .to_string()
}
