use crate::error::ArsenalDbResult as Result;

/// Lowercase the title and collapse every run of non-word characters into a single hyphen.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

/// Derive a slug from `title` that `taken` reports as free, appending `-2`, `-3`, ... on collision.
pub fn unique_slug(title: &str, mut taken: impl FnMut(&str) -> Result<bool>) -> Result<String> {
    let base = match slugify(title) {
        s if s.is_empty() => "untitled".to_string(),
        s => s,
    };
    if !taken(&base)? {
        return Ok(base);
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}-{}", base, n);
        if !taken(&candidate)? {
            return Ok(candidate);
        }
        n += 1;
    }
}
