//! Route table
//!
//! Maps a resource path pattern (`/project/{projectId}`) to what the dispatcher
//! does for it. Lookup is an exact string match on the pattern: no prefix
//! matching, no trailing-slash normalization. The table is built once at
//! startup and never mutated.

use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

use crate::error::RouteTableError;

/// What a route does, without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// Static text, no database access
    Echo,
    /// Query returning every row, encoding negotiated from `Accept`
    MultiRow,
    /// Query returning the first row only, always JSON
    SingleRow,
}

/// Route behaviour with its fixed parameters
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Handler {
    Echo { text: String },
    MultiRow { query: String },
    SingleRow { query: String },
}

impl Handler {
    pub fn kind(&self) -> HandlerKind {
        match self {
            Handler::Echo { .. } => HandlerKind::Echo,
            Handler::MultiRow { .. } => HandlerKind::MultiRow,
            Handler::SingleRow { .. } => HandlerKind::SingleRow,
        }
    }

    /// SQL template, absent for Echo
    pub fn query_template(&self) -> Option<&str> {
        match self {
            Handler::Echo { .. } => None,
            Handler::MultiRow { query } | Handler::SingleRow { query } => Some(query),
        }
    }
}

/// One route table entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Route {
    pub path: String,
    #[serde(flatten)]
    pub handler: Handler,
}

impl Route {
    pub fn echo(path: &str, text: &str) -> Self {
        Self {
            path: path.to_string(),
            handler: Handler::Echo {
                text: text.to_string(),
            },
        }
    }

    pub fn multi_row(path: &str, query: &str) -> Self {
        Self {
            path: path.to_string(),
            handler: Handler::MultiRow {
                query: query.to_string(),
            },
        }
    }

    pub fn single_row(path: &str, query: &str) -> Self {
        Self {
            path: path.to_string(),
            handler: Handler::SingleRow {
                query: query.to_string(),
            },
        }
    }

    /// Placeholder names in the path pattern, in order
    pub fn path_parameter_names(&self) -> Vec<&str> {
        self.path
            .split('/')
            .filter_map(|segment| segment.strip_prefix('{')?.strip_suffix('}'))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RouteFile {
    routes: Vec<Route>,
}

/// Report columns shared by the per-year and per-month report queries
macro_rules! report_columns {
    () => {
        "r.id report_id, r.date, r.email_address, r.project, p.project_id project_id, \
         r.street_number, r.street, r.postcode, r.minutes, \
         r.trap_checked, r.trap_reset, r.trap_lure_added, r.trap_caught, \
         r.bait_checked, r.bait_added, r.bait_taken, \
         r.submission_id, r.created_at, r.ip_address"
    };
}

/// Immutable route lookup keyed by resource path pattern
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: IndexMap<String, Route>,
}

impl RouteTable {
    /// Build a table, rejecting duplicate paths and empty query templates
    pub fn new(routes: Vec<Route>) -> Result<Self, RouteTableError> {
        let mut table = IndexMap::with_capacity(routes.len());
        for route in routes {
            if route
                .handler
                .query_template()
                .is_some_and(|query| query.trim().is_empty())
            {
                return Err(RouteTableError::EmptyQuery(route.path));
            }
            if table.contains_key(&route.path) {
                return Err(RouteTableError::Duplicate(route.path));
            }
            table.insert(route.path.clone(), route);
        }
        Ok(Self { routes: table })
    }

    /// Parse a TOML route file (`[[routes]]` entries)
    pub fn from_toml_str(content: &str) -> Result<Self, RouteTableError> {
        let file: RouteFile = toml::from_str(content)?;
        Self::new(file.routes)
    }

    pub fn load(path: &Path) -> Result<Self, RouteTableError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Exact-match lookup on the resource path pattern
    pub fn lookup(&self, resource_path: &str) -> Option<&Route> {
        self.routes.get(resource_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// The Urban Rat Project reporting routes
    pub fn builtin() -> Self {
        let routes = vec![
            Route::echo("/", "Hello from The Urban Rat Project"),
            Route::multi_row("/projects", "SELECT * from public.latest_project_revisions;"),
            Route::single_row(
                "/project/{projectId}",
                "SELECT * from public.latest_project_revisions WHERE project_id = {projectId} LIMIT 1;",
            ),
            Route::multi_row("/stories", "SELECT * from public.latest_story_revisions;"),
            Route::single_row(
                "/story/{storyId}",
                "SELECT * from public.latest_story_revisions WHERE story_id = {storyId} LIMIT 1;",
            ),
            Route::multi_row(
                "/project/{projectId}/reports/by-month",
                "SELECT date_part('YEAR', date)::int AS year, date_part('month', date)::int AS month, \
                 COUNT(*) count FROM public.reports r \
                 LEFT JOIN latest_project_revisions p ON r.project = p.title \
                 WHERE p.project_id = {projectId} \
                 GROUP BY year, month ORDER BY year DESC, month DESC;",
            ),
            Route::multi_row(
                "/project/{projectId}/reports/{year}",
                concat!(
                    "SELECT ", report_columns!(), " FROM reports r ",
                    "LEFT JOIN latest_project_revisions p ON r.project = p.title ",
                    "WHERE project_id = {projectId} AND date_part('YEAR', date) = {year} ",
                    "ORDER BY date ASC, email_address ASC, r.id ASC;"
                ),
            ),
            Route::multi_row(
                "/project/{projectId}/reports/{year}/{month}",
                concat!(
                    "SELECT ", report_columns!(), " FROM reports r ",
                    "LEFT JOIN latest_project_revisions p ON r.project = p.title ",
                    "WHERE project_id = {projectId} AND date_part('YEAR', date) = {year} ",
                    "AND date_part('month', date) = {month} ",
                    "ORDER BY date ASC, email_address ASC, r.id ASC;"
                ),
            ),
            Route::multi_row(
                "/user/{emailAddress}/reports",
                "SELECT * FROM public.reports WHERE email_address = '{emailAddress}' ORDER BY date ASC;",
            ),
            Route::multi_row("/reports-for-export", "SELECT * FROM public.reports_for_export;"),
            Route::multi_row("/postcodes", "SELECT * FROM public.postcodes;"),
        ];

        Self {
            routes: routes
                .into_iter()
                .map(|route| (route.path.clone(), route))
                .collect(),
        }
    }
}
