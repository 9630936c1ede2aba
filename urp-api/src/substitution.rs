//! Path parameter substitution into SQL templates
//!
//! Values are spliced into the SQL as literal text with no quoting or escaping.
//! A template author wraps textual placeholders in quotes
//! (`WHERE email_address = '{emailAddress}'`). Path parameters are trusted.
//! Swapping this function for bound parameters is the upgrade path if that
//! stops being true.

/// Replace `{key}` placeholders with their values
///
/// Parameters are applied in iteration order and each replaces only the
/// first remaining occurrence of its placeholder. A placeholder repeated in the
/// template keeps its later occurrences; a placeholder with no parameter stays
/// as literal text. Neither case is an error.
pub fn substitute<'a, I, K, V>(template: &str, params: I) -> String
where
    I: IntoIterator<Item = (&'a K, &'a V)>,
    K: AsRef<str> + ?Sized + 'a,
    V: AsRef<str> + ?Sized + 'a,
{
    let mut sql = template.to_string();
    for (key, value) in params {
        let placeholder = format!("{{{}}}", key.as_ref());
        sql = sql.replacen(&placeholder, value.as_ref(), 1);
    }
    sql
}
