//! Navigation menus per role.

use shared::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavTarget {
    Path(&'static str),
    /// Ends the session instead of navigating
    Logout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationEntry {
    pub label: &'static str,
    pub target: NavTarget,
    pub icon: &'static str,
}

impl NavigationEntry {
    const fn link(label: &'static str, path: &'static str, icon: &'static str) -> Self {
        Self {
            label,
            target: NavTarget::Path(path),
            icon,
        }
    }

    const fn logout() -> Self {
        Self {
            label: "Logout",
            target: NavTarget::Logout,
            icon: "logout",
        }
    }

    pub fn path(&self) -> Option<&'static str> {
        match self.target {
            NavTarget::Path(path) => Some(path),
            NavTarget::Logout => None,
        }
    }
}

static ANONYMOUS_ROUTES: [NavigationEntry; 5] = [
    NavigationEntry::link("Home", "/", "home"),
    NavigationEntry::link("Login", "/login", "login"),
    NavigationEntry::link("Parent Signup", "/parent/sign-up", "family"),
    NavigationEntry::link("Teacher Signup", "/teacher/sign-up", "school"),
    NavigationEntry::link("About", "/about", "info"),
];

static PARENT_ROUTES: [NavigationEntry; 8] = [
    NavigationEntry::link("Dashboard", "/dashboard/parent", "grid"),
    NavigationEntry::link("My Children", "/children/view", "face"),
    NavigationEntry::link("Add Child", "/children/new", "person-add"),
    NavigationEntry::link("Add Medical", "/medical/new", "medical"),
    NavigationEntry::link("Add Absence Request", "/absenceRequest/new", "add-box"),
    NavigationEntry::link("View Absences", "/absenceRequest/view", "event-available"),
    NavigationEntry::link("About", "/about", "info"),
    NavigationEntry::logout(),
];

static TEACHER_ROUTES: [NavigationEntry; 5] = [
    NavigationEntry::link("Dashboard", "/dashboard/teacher", "grid"),
    NavigationEntry::link("My Children", "/view/students", "face"),
    NavigationEntry::link("View Absence Requests", "/absence-requests", "event-available"),
    NavigationEntry::link("About", "/about", "info"),
    NavigationEntry::logout(),
];

pub fn routes_for(role: Role) -> &'static [NavigationEntry] {
    match role {
        Role::Anonymous => &ANONYMOUS_ROUTES,
        Role::Parent => &PARENT_ROUTES,
        Role::Teacher => &TEACHER_ROUTES,
    }
}

/// Menu for a stored role token. Missing or unknown tokens get the
/// anonymous menu.
pub fn routes_for_token(token: Option<&str>) -> &'static [NavigationEntry] {
    routes_for(Role::from_token(token))
}
