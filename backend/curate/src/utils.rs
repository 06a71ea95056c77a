use regex::Regex;

/// Lowercase, underscores to spaces, drops anything but letters, digits, dashes and
/// spaces, collapses runs of spaces.
pub fn sanitize(input: &str) -> String {
    let replace = Regex::new(r"[_]").expect("static regex");
    let mut s = replace.replace_all(input, " ").into_owned();

    let clean_re = Regex::new(r"[^A-Za-z0-9- ]").expect("static regex");
    s = clean_re.replace_all(&s, "").into_owned();

    s = s.trim().to_string();

    let collapse = Regex::new(r" +").expect("static regex");
    collapse.replace_all(&s, " ").into_owned().to_lowercase()
}

/// Category slug: [`sanitize`] with spaces and dashes removed, "Demon Slayer" -> "demonslayer".
pub fn slug(input: &str) -> String {
    sanitize(input).replace([' ', '-'], "")
}

pub fn sanitize_tags(tags: &[String]) -> Vec<String> {
    let mut clean: Vec<String> = Vec::with_capacity(tags.len());

    for tag in tags.iter().map(|tag| sanitize(tag)) {
        if !tag.is_empty() && !clean.contains(&tag) {
            clean.push(tag);
        }
    }

    clean
}
