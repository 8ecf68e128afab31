//! Search, ordering and pagination over role-scoped collections
//!
//! Repositories return the rows a caller may see; this module narrows them
//! by `search`, sorts them by `ordering` and cuts out the requested page.

use crate::contract::{
    Achievement, Attendance, Grade, Homework, LeaderboardEntry, ListQuery, Notification, Page,
    ParentChild,
    Schedule, School, SchoolClass, SchoolError, Subject, SubmittedHomework, User,
    UserAchievement, UserProfile,
};
use std::cmp::Ordering;

/// A record that can be listed through a collection endpoint
pub trait Listable {
    /// Fields accepted by `ordering`; anything else is ignored
    const ORDERING_FIELDS: &'static [&'static str];

    /// Ordering applied when the caller gives none
    const DEFAULT_ORDERING: &'static str;

    /// Text matched by `search`
    fn search_text(&self) -> Vec<&str>;

    /// Compare two records by one of `ORDERING_FIELDS`
    fn compare_by(&self, other: &Self, field: &str) -> Ordering;
}

/// Apply a list query to a scoped collection
pub fn paginate<T: Listable>(
    mut items: Vec<T>,
    query: &ListQuery,
    max_page_size: u64,
) -> Result<Page<T>, SchoolError> {
    if query.page == 0 {
        return Err(SchoolError::validation("page must be 1 or greater"));
    }
    // zero falls back to the default size, anything larger is capped
    let page_size = match query.page_size {
        0 => ListQuery::default().page_size,
        size => size,
    }
    .min(max_page_size.max(1));

    if let Some(needle) = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        let needle = needle.to_lowercase();
        items.retain(|item| {
            item.search_text()
                .iter()
                .any(|text| text.to_lowercase().contains(&needle))
        });
    }

    let mut keys = ordering_keys::<T>(query.ordering.as_deref().unwrap_or_default());
    if keys.is_empty() {
        keys = ordering_keys::<T>(T::DEFAULT_ORDERING);
    }
    // stable sort keeps storage order (by id) as the last tie-breaker
    items.sort_by(|a, b| {
        keys.iter()
            .map(|(field, descending)| {
                let ord = a.compare_by(b, field);
                if *descending {
                    ord.reverse()
                } else {
                    ord
                }
            })
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    });

    let total = items.len();
    let offset =
        usize::try_from((query.page - 1).saturating_mul(page_size)).unwrap_or(usize::MAX);
    if query.page > 1 && offset >= total {
        return Err(SchoolError::not_found("page", query.page));
    }

    let take = usize::try_from(page_size).unwrap_or(usize::MAX);
    let items = items.into_iter().skip(offset).take(take).collect();
    Ok(Page {
        items,
        total,
        page: query.page,
        page_size,
    })
}

fn ordering_keys<T: Listable>(ordering: &str) -> Vec<(&'static str, bool)> {
    ordering
        .split(',')
        .map(str::trim)
        .filter_map(|raw| {
            let (name, descending) = match raw.strip_prefix('-') {
                Some(name) => (name, true),
                None => (raw, false),
            };
            T::ORDERING_FIELDS
                .iter()
                .find(|known| **known == name)
                .map(|known| (*known, descending))
        })
        .collect()
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

impl Listable for User {
    const ORDERING_FIELDS: &'static [&'static str] = &[
        "id",
        "username",
        "email",
        "first_name",
        "last_name",
        "date_joined",
    ];
    const DEFAULT_ORDERING: &'static str = "username";

    fn search_text(&self) -> Vec<&str> {
        vec![
            self.username.as_str(),
            self.first_name.as_str(),
            self.last_name.as_str(),
            self.email.as_str(),
        ]
    }

    fn compare_by(&self, other: &Self, field: &str) -> Ordering {
        match field {
            "id" => self.id.cmp(&other.id),
            "username" => self.username.cmp(&other.username),
            "email" => self.email.cmp(&other.email),
            "first_name" => self.first_name.cmp(&other.first_name),
            "last_name" => self.last_name.cmp(&other.last_name),
            "date_joined" => self.date_joined.cmp(&other.date_joined),
            _ => Ordering::Equal,
        }
    }
}

impl Listable for School {
    const ORDERING_FIELDS: &'static [&'static str] = &["id", "name", "established_date"];
    const DEFAULT_ORDERING: &'static str = "name";

    fn search_text(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.address.as_str()]
    }

    fn compare_by(&self, other: &Self, field: &str) -> Ordering {
        match field {
            "id" => self.id.cmp(&other.id),
            "name" => self.name.cmp(&other.name),
            "established_date" => self.established_date.cmp(&other.established_date),
            _ => Ordering::Equal,
        }
    }
}

impl Listable for SchoolClass {
    const ORDERING_FIELDS: &'static [&'static str] = &["id", "name"];
    const DEFAULT_ORDERING: &'static str = "name";

    fn search_text(&self) -> Vec<&str> {
        vec![self.name.as_str()]
    }

    fn compare_by(&self, other: &Self, field: &str) -> Ordering {
        match field {
            "id" => self.id.cmp(&other.id),
            "name" => self.name.cmp(&other.name),
            _ => Ordering::Equal,
        }
    }
}

impl Listable for Subject {
    const ORDERING_FIELDS: &'static [&'static str] = &["id", "name"];
    const DEFAULT_ORDERING: &'static str = "name";

    fn search_text(&self) -> Vec<&str> {
        vec![self.name.as_str()]
    }

    fn compare_by(&self, other: &Self, field: &str) -> Ordering {
        match field {
            "id" => self.id.cmp(&other.id),
            "name" => self.name.cmp(&other.name),
            _ => Ordering::Equal,
        }
    }
}

impl Listable for ParentChild {
    const ORDERING_FIELDS: &'static [&'static str] = &["id"];
    const DEFAULT_ORDERING: &'static str = "id";

    fn search_text(&self) -> Vec<&str> {
        Vec::new()
    }

    fn compare_by(&self, other: &Self, field: &str) -> Ordering {
        match field {
            "id" => self.id.cmp(&other.id),
            _ => Ordering::Equal,
        }
    }
}

impl Listable for Schedule {
    const ORDERING_FIELDS: &'static [&'static str] = &["id", "weekday", "start_time"];
    const DEFAULT_ORDERING: &'static str = "weekday,start_time";

    fn search_text(&self) -> Vec<&str> {
        Vec::new()
    }

    fn compare_by(&self, other: &Self, field: &str) -> Ordering {
        match field {
            "id" => self.id.cmp(&other.id),
            "weekday" => self.weekday.cmp(&other.weekday),
            "start_time" => self.start_time.cmp(&other.start_time),
            _ => Ordering::Equal,
        }
    }
}

impl Listable for Homework {
    const ORDERING_FIELDS: &'static [&'static str] = &["due_date", "created_at"];
    const DEFAULT_ORDERING: &'static str = "due_date";

    fn search_text(&self) -> Vec<&str> {
        vec![self.description.as_str()]
    }

    fn compare_by(&self, other: &Self, field: &str) -> Ordering {
        match field {
            "due_date" => self.due_date.cmp(&other.due_date),
            "created_at" => self.created_at.cmp(&other.created_at),
            _ => Ordering::Equal,
        }
    }
}

impl Listable for SubmittedHomework {
    const ORDERING_FIELDS: &'static [&'static str] = &["id", "submitted_at", "status", "grade"];
    const DEFAULT_ORDERING: &'static str = "-submitted_at";

    fn search_text(&self) -> Vec<&str> {
        let mut text = vec![self.status.as_str(), self.submission_file.as_str()];
        if let Some(feedback) = &self.feedback {
            text.push(feedback);
        }
        text
    }

    fn compare_by(&self, other: &Self, field: &str) -> Ordering {
        match field {
            "id" => self.id.cmp(&other.id),
            "submitted_at" => self.submitted_at.cmp(&other.submitted_at),
            "status" => self.status.as_str().cmp(other.status.as_str()),
            "grade" => match (self.grade, other.grade) {
                (Some(a), Some(b)) => cmp_f64(a, b),
                (a, b) => a.is_some().cmp(&b.is_some()),
            },
            _ => Ordering::Equal,
        }
    }
}

impl Listable for Grade {
    const ORDERING_FIELDS: &'static [&'static str] = &["id", "date", "grade", "value"];
    const DEFAULT_ORDERING: &'static str = "-date";

    fn search_text(&self) -> Vec<&str> {
        self.comments.as_deref().into_iter().collect()
    }

    fn compare_by(&self, other: &Self, field: &str) -> Ordering {
        match field {
            "id" => self.id.cmp(&other.id),
            "date" => self.date.cmp(&other.date),
            "grade" | "value" => cmp_f64(self.value, other.value),
            _ => Ordering::Equal,
        }
    }
}

impl Listable for Attendance {
    const ORDERING_FIELDS: &'static [&'static str] = &["id", "date", "status"];
    const DEFAULT_ORDERING: &'static str = "-date";

    fn search_text(&self) -> Vec<&str> {
        let mut text = vec![self.status.as_str()];
        if let Some(notes) = &self.notes {
            text.push(notes);
        }
        text
    }

    fn compare_by(&self, other: &Self, field: &str) -> Ordering {
        match field {
            "id" => self.id.cmp(&other.id),
            "date" => self.date.cmp(&other.date),
            "status" => self.status.as_str().cmp(other.status.as_str()),
            _ => Ordering::Equal,
        }
    }
}

impl Listable for Achievement {
    const ORDERING_FIELDS: &'static [&'static str] = &["id", "name", "xp_reward"];
    const DEFAULT_ORDERING: &'static str = "name";

    fn search_text(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.description.as_str()]
    }

    fn compare_by(&self, other: &Self, field: &str) -> Ordering {
        match field {
            "id" => self.id.cmp(&other.id),
            "name" => self.name.cmp(&other.name),
            "xp_reward" => self.xp_reward.cmp(&other.xp_reward),
            _ => Ordering::Equal,
        }
    }
}

impl Listable for UserAchievement {
    const ORDERING_FIELDS: &'static [&'static str] = &["id", "achieved_at"];
    const DEFAULT_ORDERING: &'static str = "-achieved_at";

    fn search_text(&self) -> Vec<&str> {
        Vec::new()
    }

    fn compare_by(&self, other: &Self, field: &str) -> Ordering {
        match field {
            "id" => self.id.cmp(&other.id),
            "achieved_at" => self.achieved_at.cmp(&other.achieved_at),
            _ => Ordering::Equal,
        }
    }
}

impl Listable for UserProfile {
    const ORDERING_FIELDS: &'static [&'static str] = &["id", "xp", "level"];
    const DEFAULT_ORDERING: &'static str = "-xp";

    fn search_text(&self) -> Vec<&str> {
        Vec::new()
    }

    fn compare_by(&self, other: &Self, field: &str) -> Ordering {
        match field {
            "id" => self.id.cmp(&other.id),
            "xp" => self.xp.cmp(&other.xp),
            "level" => self.level.cmp(&other.level),
            _ => Ordering::Equal,
        }
    }
}

impl Listable for LeaderboardEntry {
    const ORDERING_FIELDS: &'static [&'static str] = &["rank", "score", "username"];
    const DEFAULT_ORDERING: &'static str = "rank";

    fn search_text(&self) -> Vec<&str> {
        vec![&self.username]
    }

    fn compare_by(&self, other: &Self, field: &str) -> Ordering {
        match field {
            "rank" => self.rank.cmp(&other.rank),
            "score" => cmp_f64(self.score, other.score),
            "username" => self.username.cmp(&other.username),
            _ => Ordering::Equal,
        }
    }
}

impl Listable for Notification {
    const ORDERING_FIELDS: &'static [&'static str] = &["id", "created_at", "is_read"];
    const DEFAULT_ORDERING: &'static str = "-created_at";

    fn search_text(&self) -> Vec<&str> {
        vec![self.message.as_str()]
    }

    fn compare_by(&self, other: &Self, field: &str) -> Ordering {
        match field {
            "id" => self.id.cmp(&other.id),
            "created_at" => self.created_at.cmp(&other.created_at),
            "is_read" => self.is_read.cmp(&other.is_read),
            _ => Ordering::Equal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subjects(names: &[&str]) -> Vec<Subject> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| Subject {
                id: i as i64 + 1,
                name: name.to_string(),
            })
            .collect()
    }

    fn query(
        search: Option<&str>,
        ordering: Option<&str>,
        page: u64,
        page_size: u64,
    ) -> ListQuery {
        ListQuery {
            search: search.map(str::to_string),
            ordering: ordering.map(str::to_string),
            page,
            page_size,
        }
    }

    fn names(page: &Page<Subject>) -> Vec<&str> {
        page.items.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn default_ordering_applies() {
        let items = subjects(&["Physics", "Algebra", "Chemistry"]);
        let page = paginate(items, &ListQuery::default(), 100).unwrap();
        assert_eq!(names(&page), vec!["Algebra", "Chemistry", "Physics"]);
        assert_eq!(page.total, 3);
    }

    #[test]
    fn descending_and_unknown_fields() {
        let items = subjects(&["Physics", "Algebra", "Chemistry"]);
        let page = paginate(items.clone(), &query(None, Some("-name"), 1, 10), 100).unwrap();
        assert_eq!(names(&page), vec!["Physics", "Chemistry", "Algebra"]);

        // unknown field ignored, falls back to default
        let page = paginate(items, &query(None, Some("colour"), 1, 10), 100).unwrap();
        assert_eq!(names(&page), vec!["Algebra", "Chemistry", "Physics"]);
    }

    #[test]
    fn search_is_case_insensitive() {
        let page = paginate(
            subjects(&["Physics", "Algebra", "Physical Education"]),
            &query(Some("PHYS"), None, 1, 10),
            100,
        )
        .unwrap();
        assert_eq!(names(&page), vec!["Physical Education", "Physics"]);
        assert_eq!(page.total, 2);
    }

    #[test]
    fn pages_are_cut() {
        let items = subjects(&["a", "b", "c", "d", "e"]);
        let page = paginate(items.clone(), &query(None, None, 2, 2), 100).unwrap();
        assert_eq!(names(&page), vec!["c", "d"]);
        assert_eq!(page.total, 5);

        let last = paginate(items.clone(), &query(None, None, 3, 2), 100).unwrap();
        assert_eq!(names(&last), vec!["e"]);

        let beyond = paginate(items, &query(None, None, 4, 2), 100).unwrap_err();
        assert!(matches!(beyond, SchoolError::NotFound { .. }));
    }

    #[test]
    fn empty_first_page_is_fine() {
        let page = paginate(Vec::<Subject>::new(), &ListQuery::default(), 100).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 0);
    }

    #[test]
    fn page_zero_is_rejected() {
        assert!(matches!(
            paginate(subjects(&["a"]), &query(None, None, 0, 10), 100),
            Err(SchoolError::Validation { .. })
        ));
    }

    #[test]
    fn page_size_is_clamped() {
        let owned: Vec<String> = (0..12).map(|i| format!("s{i:02}")).collect();
        let items = subjects(&owned.iter().map(String::as_str).collect::<Vec<_>>());

        let capped = paginate(items.clone(), &query(None, None, 1, 500), 5).unwrap();
        assert_eq!(capped.page_size, 5);
        assert_eq!(capped.items.len(), 5);

        let fallback = paginate(items, &query(None, None, 1, 0), 100).unwrap();
        assert_eq!(fallback.page_size, 10);
        assert_eq!(fallback.items.len(), 10);
    }
}
