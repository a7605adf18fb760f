//! Admin-maintained reference data: divisions, churches, their leaders,
//! events and user accounts.

pub mod churches;
pub mod divisions;
pub mod events;
pub mod users;

#[cfg(test)]
mod tests;

/// "1 church", "3 churches".
pub(crate) fn plural(count: u64, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("1 {singular}")
    } else {
        format!("{count} {plural}")
    }
}

pub(crate) fn clean_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}
