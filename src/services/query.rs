//! Search, sort and pagination for list views
//!
//! Every record type exposes an explicit list of derived strings
//! ([`Searchable::search_fields`]). A free-text query matches when any of them
//! contains it, ignoring case. Sorting is stable, so ties keep input order, and
//! pages are 1-indexed.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Local, Utc};
use rayon::prelude::*;
use serde::Serialize;

use crate::services::dates::TimeOfDay;
use crate::types::{Blog, Category, Cow, MilkingSession, User};

/// Date layouts a user might type when searching
const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%b %-d, %Y", "%-d %B %Y"];

/// Projection of a record onto the strings a query is matched against
pub trait Searchable {
    fn search_fields(&self) -> Vec<String>;
}

fn push_dates(fields: &mut Vec<String>, ts: DateTime<Utc>) {
    let local = ts.with_timezone(&Local);
    for format in DATE_FORMATS {
        fields.push(local.format(format).to_string());
    }
}

/// Volume strings: `5`, `5.0`, `5.0L`, `5.0 L`, `5.00`
pub fn volume_fields(volume: f64) -> [String; 5] {
    [
        format!("{}", volume),
        format!("{:.1}", volume),
        format!("{:.1}L", volume),
        format!("{:.1} L", volume),
        format!("{:.2}", volume),
    ]
}

/// A session joined with the display names a list page shows next to it
#[derive(Debug, Clone, Copy)]
pub struct SessionRow<'a> {
    pub session: &'a MilkingSession,
    pub cow_name: Option<&'a str>,
    pub milker_name: Option<&'a str>,
}

impl<'a> SessionRow<'a> {
    pub fn new(session: &'a MilkingSession) -> Self {
        Self {
            session,
            cow_name: session.cow_name.as_deref(),
            milker_name: session.milker_name.as_deref(),
        }
    }

    /// Fill names from lookup tables, keeping names the server already joined
    pub fn with_names(
        session: &'a MilkingSession,
        cows: &'a HashMap<u64, String>,
        users: &'a HashMap<u64, String>,
    ) -> Self {
        let mut row = Self::new(session);
        if row.cow_name.is_none() {
            row.cow_name = session.cow_id.and_then(|id| cows.get(&id)).map(String::as_str);
        }
        if row.milker_name.is_none() {
            row.milker_name = session
                .milker_id
                .and_then(|id| users.get(&id))
                .map(String::as_str);
        }
        row
    }
}

impl Searchable for SessionRow<'_> {
    fn search_fields(&self) -> Vec<String> {
        let s = self.session;
        let mut fields = Vec::with_capacity(20);
        fields.push(s.id.to_string());
        if let Some(cow_id) = s.cow_id {
            fields.push(cow_id.to_string());
        }
        fields.extend(self.cow_name.map(String::from));
        fields.extend(self.milker_name.map(String::from));
        fields.extend(s.notes.clone());

        if let Some(ts) = s.milking_time {
            push_dates(&mut fields, ts);
            fields.push(ts.with_timezone(&Local).format("%H:%M").to_string());
            fields.push(TimeOfDay::of(ts).label().to_string());
        }

        fields.extend(volume_fields(s.volume));
        fields
    }
}

impl Searchable for MilkingSession {
    fn search_fields(&self) -> Vec<String> {
        SessionRow::new(self).search_fields()
    }
}

impl Searchable for Blog {
    fn search_fields(&self) -> Vec<String> {
        let mut fields = vec![self.id.to_string(), self.title.clone(), self.content.clone()];
        if let Some(ts) = self.created_at {
            push_dates(&mut fields, ts);
        }
        fields
    }
}

impl Searchable for Category {
    fn search_fields(&self) -> Vec<String> {
        vec![self.id.to_string(), self.name.clone()]
    }
}

impl Searchable for User {
    fn search_fields(&self) -> Vec<String> {
        let mut fields = vec![
            self.id.to_string(),
            self.name.clone(),
            self.username.clone(),
            self.role.label().to_string(),
        ];
        fields.extend(self.email.clone());
        fields
    }
}

impl Searchable for Cow {
    fn search_fields(&self) -> Vec<String> {
        let mut fields = vec![self.id.to_string(), self.name.clone()];
        fields.extend(self.breed.clone());
        fields.extend(self.gender.clone());
        fields.extend(self.lactation_phase.map(|p| p.label().to_string()));
        fields
    }
}

impl<T: Searchable + ?Sized> Searchable for &T {
    fn search_fields(&self) -> Vec<String> {
        (**self).search_fields()
    }
}

/// Case-insensitive substring match; a blank query matches everything
pub fn matches<T: Searchable + ?Sized>(item: &T, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    item.search_fields()
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

/// Items passing `predicate` and matching `query`, in input order
pub fn filter_items<'a, T, P>(items: &'a [T], query: &str, predicate: P) -> Vec<&'a T>
where
    T: Searchable + Sync,
    P: Fn(&T) -> bool + Sync,
{
    items
        .par_iter()
        .filter(|item| predicate(item) && matches(*item, query))
        .collect()
}

/// Number of pages needed for `len` items (0 for an empty list)
pub fn page_count(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    len.div_ceil(page_size)
}

/// 1-indexed page slice; out-of-range pages are empty, never an error
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    if page == 0 || page_size == 0 {
        return &[];
    }
    let start = (page - 1).saturating_mul(page_size);
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

/// One page of a filtered list, ready for display or JSON output
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Page<T> {
    pub page: usize,
    pub page_size: usize,
    pub page_count: usize,
    pub total: usize,
    pub items: Vec<T>,
}

impl<T: Clone> Page<T> {
    pub fn of(items: &[T], page: usize, page_size: usize) -> Self {
        Self {
            page,
            page_size,
            page_count: page_count(items.len(), page_size),
            total: items.len(),
            items: paginate(items, page, page_size).to_vec(),
        }
    }
}

/// Category predicate for blog lists; `assignments` maps blog id to category ids
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlogFilter {
    pub category_id: Option<u64>,
}

impl BlogFilter {
    pub fn matches(&self, blog: &Blog, assignments: &HashMap<u64, Vec<u64>>) -> bool {
        match self.category_id {
            None => true,
            Some(category) => assignments
                .get(&blog.id)
                .is_some_and(|ids| ids.contains(&category)),
        }
    }
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Sort mode for session lists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum SessionSort {
    #[default]
    DateDesc,
    DateAsc,
    VolumeDesc,
    VolumeAsc,
    Cow,
}

impl SessionSort {
    /// Stable sort of any list that can yield a session
    pub fn sort_by<T>(self, items: &mut [T], session: impl Fn(&T) -> &MilkingSession) {
        match self {
            Self::DateDesc => {
                items.sort_by(|a, b| session(b).milking_time.cmp(&session(a).milking_time))
            }
            Self::DateAsc => {
                items.sort_by(|a, b| session(a).milking_time.cmp(&session(b).milking_time))
            }
            Self::VolumeDesc => items.sort_by(|a, b| cmp_f64(session(b).volume, session(a).volume)),
            Self::VolumeAsc => items.sort_by(|a, b| cmp_f64(session(a).volume, session(b).volume)),
            Self::Cow => items.sort_by(|a, b| session(a).cow_id.cmp(&session(b).cow_id)),
        }
    }
}

/// Sort mode for blog lists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum BlogSort {
    #[default]
    Newest,
    Oldest,
    Title,
}

impl BlogSort {
    pub fn sort(self, blogs: &mut [&Blog]) {
        match self {
            Self::Newest => blogs.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            Self::Oldest => blogs.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            Self::Title => blogs.sort_by_key(|b| b.title.to_lowercase()),
        }
    }
}

/// Sort mode for user lists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum UserSort {
    #[default]
    Name,
    Username,
    Role,
    Id,
}

impl UserSort {
    pub fn sort(self, users: &mut [&User]) {
        match self {
            Self::Name => users.sort_by_key(|u| u.name.to_lowercase()),
            Self::Username => users.sort_by_key(|u| u.username.to_lowercase()),
            Self::Role => users.sort_by_key(|u| u.role.id()),
            Self::Id => users.sort_by_key(|u| u.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::dates::parse_timestamp;
    use crate::types::Role;

    fn session(id: u64, cow_id: u64, volume: f64, time: &str) -> MilkingSession {
        MilkingSession {
            id,
            cow_id: Some(cow_id),
            milker_id: Some(9),
            volume,
            milking_time: parse_timestamp(time),
            notes: None,
            cow_name: None,
            milker_name: None,
        }
    }

    // ========== search tests ==========

    #[test]
    fn test_search_volume_with_unit() {
        let s = session(1, 1, 5.0, "2024-01-01T06:00:00");
        assert!(matches(&s, "5.0"));
        assert!(matches(&s, "5.0L"));
        assert!(matches(&s, "5.0 l"));
        assert!(!matches(&s, "6.0"));
    }

    #[test]
    fn test_search_time_of_day() {
        let morning = session(1, 1, 5.0, "2024-01-01T06:00:00");
        let evening = session(2, 1, 5.0, "2024-01-01T18:00:00");
        assert!(matches(&morning, "morning"));
        assert!(!matches(&evening, "morning"));
        assert!(matches(&evening, "Evening"));
    }

    #[test]
    fn test_search_date_formats() {
        let s = session(1, 1, 5.0, "2024-03-10T23:59:00");
        assert!(matches(&s, "2024-03-10"));
        assert!(matches(&s, "10/03/2024"));
        assert!(matches(&s, "03/10/2024"));
        assert!(matches(&s, "mar 10, 2024"));
        assert!(matches(&s, "10 march"));
        assert!(matches(&s, "23:59"));
    }

    #[test]
    fn test_search_names_from_lookup() {
        let s = session(1, 4, 5.0, "2024-01-01T06:00:00");
        let cows: HashMap<u64, String> = [(4, "Bessie".to_string())].into_iter().collect();
        let users: HashMap<u64, String> = [(9, "Joan".to_string())].into_iter().collect();
        let row = SessionRow::with_names(&s, &cows, &users);

        assert!(matches(&row, "bess"));
        assert!(matches(&row, "JOAN"));
        assert!(!matches(&SessionRow::new(&s), "bess"));
    }

    #[test]
    fn test_search_blank_matches_all() {
        let s = session(1, 1, 5.0, "bad");
        assert!(matches(&s, ""));
        assert!(matches(&s, "   "));
    }

    #[test]
    fn test_search_user_role_and_email() {
        let user = User {
            id: 3,
            role: Role::Farmer,
            name: "Kim".into(),
            username: "kim".into(),
            email: Some("kim@farm.test".into()),
        };
        assert!(matches(&user, "farmer"));
        assert!(matches(&user, "farm.test"));
        assert!(!matches(&user, "admin"));
    }

    // ========== filter_items tests ==========

    #[test]
    fn test_filter_items_keeps_order_and_predicate() {
        let sessions: Vec<MilkingSession> = (1..=20)
            .map(|i| session(i, i % 3, 5.0, "2024-01-01T06:00:00"))
            .collect();
        let kept = filter_items(&sessions, "5.0L", |s| s.cow_id == Some(1));
        let ids: Vec<u64> = kept.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 4, 7, 10, 13, 16, 19]);
    }

    // ========== pagination tests ==========

    #[test]
    fn test_paginate_beyond_last_page_is_empty() {
        let items: Vec<u32> = (0..10).collect();
        assert!(paginate(&items, 99, 8).is_empty());
    }

    #[test]
    fn test_paginate_pages() {
        let items: Vec<u32> = (0..10).collect();
        assert_eq!(paginate(&items, 1, 8), &[0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(paginate(&items, 2, 8), &[8, 9]);
        assert!(paginate(&items, 3, 8).is_empty());
        assert!(paginate(&items, 0, 8).is_empty());
        assert!(paginate(&items, 1, 0).is_empty());
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 8), 0);
        assert_eq!(page_count(8, 8), 1);
        assert_eq!(page_count(10, 8), 2);
        assert_eq!(page_count(10, 0), 0);
    }

    #[test]
    fn test_page_of_reports_totals() {
        let items: Vec<u32> = (0..10).collect();
        let page = Page::of(&items, 2, 8);
        assert_eq!(page.total, 10);
        assert_eq!(page.page_count, 2);
        assert_eq!(page.items, vec![8, 9]);
    }

    // ========== sort tests ==========

    #[test]
    fn test_session_sort_stable_ties() {
        let sessions = vec![
            session(1, 1, 5.0, "2024-01-01T06:00:00"),
            session(2, 2, 7.0, "2024-01-01T06:00:00"),
            session(3, 3, 5.0, "2024-01-01T06:00:00"),
            session(4, 4, 7.0, "2024-01-01T06:00:00"),
        ];
        let mut refs: Vec<&MilkingSession> = sessions.iter().collect();

        SessionSort::VolumeDesc.sort_by(&mut refs, |s| s);
        let ids: Vec<u64> = refs.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![2, 4, 1, 3]);

        SessionSort::DateAsc.sort_by(&mut refs, |s| s);
        let ids: Vec<u64> = refs.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![2, 4, 1, 3]);
    }

    #[test]
    fn test_session_sort_date_desc() {
        let sessions = vec![
            session(1, 1, 5.0, "2024-01-01T06:00:00"),
            session(2, 1, 5.0, "2024-01-03T06:00:00"),
            session(3, 1, 5.0, "2024-01-02T06:00:00"),
        ];
        let mut rows: Vec<SessionRow> = sessions.iter().map(SessionRow::new).collect();
        SessionSort::DateDesc.sort_by(&mut rows, |r| r.session);
        let ids: Vec<u64> = rows.iter().map(|r| r.session.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_blog_filter_by_category() {
        let blog = Blog { id: 1, title: "t".into(), content: String::new(), photo: None, created_at: None };
        let assignments: HashMap<u64, Vec<u64>> = [(1, vec![3, 4])].into_iter().collect();

        assert!(BlogFilter::default().matches(&blog, &HashMap::new()));
        assert!(BlogFilter { category_id: Some(4) }.matches(&blog, &assignments));
        assert!(!BlogFilter { category_id: Some(5) }.matches(&blog, &assignments));
        assert!(!BlogFilter { category_id: Some(3) }.matches(&blog, &HashMap::new()));
    }

    #[test]
    fn test_blog_sort_title_case_insensitive() {
        let blogs = [
            Blog { id: 1, title: "beta".into(), content: String::new(), photo: None, created_at: None },
            Blog { id: 2, title: "Alpha".into(), content: String::new(), photo: None, created_at: None },
        ];
        let mut refs: Vec<&Blog> = blogs.iter().collect();
        BlogSort::Title.sort(&mut refs);
        assert_eq!(refs[0].id, 2);
    }
}
