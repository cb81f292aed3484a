use crate::session::Role;

/// Navigation entry for one dashboard. The set is fixed per role; the
/// shell composes it, the UI renders it.
pub struct NavItem {
    pub label: &'static str,
    pub path: &'static str,
}

pub fn items(role: Role) -> &'static [NavItem] {
    match role {
        Role::Admin => &[
            NavItem {
                label: "Overview",
                path: "/dashboard",
            },
            NavItem {
                label: "Admissions",
                path: "/dashboard/admissions",
            },
            NavItem {
                label: "Fees",
                path: "/dashboard/fees",
            },
            NavItem {
                label: "Notices",
                path: "/dashboard/notices",
            },
            NavItem {
                label: "Roster",
                path: "/dashboard/roster",
            },
            NavItem {
                label: "Settings",
                path: "/dashboard/settings",
            },
        ],
        Role::Teacher => &[
            NavItem {
                label: "My Classes",
                path: "/teacher/dashboard",
            },
            NavItem {
                label: "Attendance",
                path: "/teacher/dashboard/attendance",
            },
            NavItem {
                label: "Notices",
                path: "/teacher/dashboard/notices",
            },
            NavItem {
                label: "Profile",
                path: "/teacher/dashboard/profile",
            },
        ],
        Role::Parent => &[
            NavItem {
                label: "Children",
                path: "/parent/dashboard",
            },
            NavItem {
                label: "Fees",
                path: "/parent/dashboard/fees",
            },
            NavItem {
                label: "Notices",
                path: "/parent/dashboard/notices",
            },
        ],
        Role::Student => &[
            NavItem {
                label: "Home",
                path: "/student/dashboard",
            },
            NavItem {
                label: "Attendance",
                path: "/student/dashboard/attendance",
            },
            NavItem {
                label: "Notices",
                path: "/student/dashboard/notices",
            },
        ],
    }
}
