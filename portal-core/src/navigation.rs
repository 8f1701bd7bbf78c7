//! Static per-role navigation trees.
//!
//! Each role owns a tree rooted at its own segment (`admin`, `donor`, ...),
//! so full paths never overlap between roles. Every leaf carries exactly one
//! [`View`]; interior nodes only group children.

use crate::role::Role;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AdminView {
    Profile,
    Donors,
    Volunteers,
    Coordinators,
    Beneficiaries,
    Campaigns,
    LiveReport,
    ReportHistory,
    Chat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CoordinatorView {
    Profile,
    Campaigns,
    Volunteers,
    Deliveries,
    LiveReport,
    Chat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DonorView {
    Profile,
    Donate,
    History,
    Certificates,
    Chat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VolunteerView {
    Profile,
    Tasks,
    Availability,
    Chat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BeneficiaryView {
    Profile,
    Requests,
    Deliveries,
    Chat,
}

/// A renderable screen, tagged by the role whose shell hosts it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum View {
    Admin(AdminView),
    Coordinator(CoordinatorView),
    Donor(DonorView),
    Volunteer(VolunteerView),
    Beneficiary(BeneficiaryView),
}

/// Data a mounted view keeps fresh by polling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LiveFeed {
    Chat,
    LiveReport,
}

impl LiveFeed {
    pub fn endpoint(self) -> &'static str {
        match self {
            LiveFeed::Chat => "/chat/messages",
            LiveFeed::LiveReport => "/reports/live",
        }
    }
}

impl View {
    pub fn role(self) -> Role {
        match self {
            View::Admin(_) => Role::Admin,
            View::Coordinator(_) => Role::Coordinator,
            View::Donor(_) => Role::Donor,
            View::Volunteer(_) => Role::Volunteer,
            View::Beneficiary(_) => Role::Beneficiary,
        }
    }

    pub fn live_feed(self) -> Option<LiveFeed> {
        match self {
            View::Admin(AdminView::Chat)
            | View::Coordinator(CoordinatorView::Chat)
            | View::Donor(DonorView::Chat)
            | View::Volunteer(VolunteerView::Chat)
            | View::Beneficiary(BeneficiaryView::Chat) => Some(LiveFeed::Chat),
            View::Admin(AdminView::LiveReport) | View::Coordinator(CoordinatorView::LiveReport) => {
                Some(LiveFeed::LiveReport)
            }
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Leaf(View),
    Group(Vec<NavigationNode>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationNode {
    pub segment: &'static str,
    pub title: &'static str,
    pub kind: NodeKind,
}

impl NavigationNode {
    fn leaf(segment: &'static str, title: &'static str, view: View) -> Self {
        Self {
            segment,
            title,
            kind: NodeKind::Leaf(view),
        }
    }

    fn group(segment: &'static str, title: &'static str, children: Vec<NavigationNode>) -> Self {
        Self {
            segment,
            title,
            kind: NodeKind::Group(children),
        }
    }

    pub fn children(&self) -> &[NavigationNode] {
        match &self.kind {
            NodeKind::Leaf(_) => &[],
            NodeKind::Group(children) => children.as_slice(),
        }
    }

    fn first_leaf(&self, prefix: &str) -> Option<(String, View)> {
        let path = format!("{prefix}/{}", self.segment);
        match &self.kind {
            NodeKind::Leaf(view) => Some((path, *view)),
            NodeKind::Group(children) => children.iter().find_map(|c| c.first_leaf(&path)),
        }
    }

    fn collect_leaves(&self, prefix: &str, out: &mut Vec<(String, View)>) {
        let path = format!("{prefix}/{}", self.segment);
        match &self.kind {
            NodeKind::Leaf(view) => out.push((path, *view)),
            NodeKind::Group(children) => {
                for child in children {
                    child.collect_leaves(&path, out);
                }
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationTree {
    pub role: Role,
    pub nodes: Vec<NavigationNode>,
}

impl NavigationTree {
    pub fn for_role(role: Role) -> Self {
        let nodes = match role {
            Role::Admin => admin_nodes(),
            Role::Coordinator => coordinator_nodes(),
            Role::Donor => donor_nodes(),
            Role::Volunteer => volunteer_nodes(),
            Role::Beneficiary => beneficiary_nodes(),
        };
        Self { role, nodes }
    }

    pub fn root_segment(&self) -> &'static str {
        self.role.as_str()
    }

    /// Landing leaf after login: the profile/configuration view.
    pub fn default_leaf(&self) -> (String, View) {
        let root = self.root_segment();
        self.nodes
            .iter()
            .find_map(|n| n.first_leaf(root))
            .unwrap_or_else(|| (format!("{root}/profile"), profile_view(self.role)))
    }

    /// Resolve a full path (`donor/history`, `/admin/users/`) to a leaf.
    /// Group paths resolve to their first leaf, the bare root to the
    /// default leaf. Anything outside the tree is `None`.
    pub fn resolve(&self, path: &str) -> Option<(String, View)> {
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        if segments.next()? != self.root_segment() {
            return None;
        }

        let mut prefix = self.root_segment().to_string();
        let mut level: &[NavigationNode] = &self.nodes;
        let mut current: Option<&NavigationNode> = None;

        for segment in segments {
            if let Some(node) = current {
                match &node.kind {
                    NodeKind::Leaf(_) => return None,
                    NodeKind::Group(children) => {
                        prefix = format!("{prefix}/{}", node.segment);
                        level = children.as_slice();
                    }
                }
            }
            current = Some(level.iter().find(|n| n.segment == segment)?);
        }

        match current {
            None => Some(self.default_leaf()),
            Some(node) => node.first_leaf(&prefix),
        }
    }

    pub fn leaves(&self) -> Vec<(String, View)> {
        let mut out = Vec::new();
        for node in &self.nodes {
            node.collect_leaves(self.root_segment(), &mut out);
        }
        out
    }
}

fn profile_view(role: Role) -> View {
    match role {
        Role::Admin => View::Admin(AdminView::Profile),
        Role::Coordinator => View::Coordinator(CoordinatorView::Profile),
        Role::Donor => View::Donor(DonorView::Profile),
        Role::Volunteer => View::Volunteer(VolunteerView::Profile),
        Role::Beneficiary => View::Beneficiary(BeneficiaryView::Profile),
    }
}

fn admin_nodes() -> Vec<NavigationNode> {
    use NavigationNode as N;
    let v = View::Admin;
    vec![
        N::leaf("profile", "Profile", v(AdminView::Profile)),
        N::group(
            "users",
            "Users",
            vec![
                N::leaf("donors", "Donors", v(AdminView::Donors)),
                N::leaf("volunteers", "Volunteers", v(AdminView::Volunteers)),
                N::leaf("coordinators", "Coordinators", v(AdminView::Coordinators)),
                N::leaf("beneficiaries", "Beneficiaries", v(AdminView::Beneficiaries)),
            ],
        ),
        N::leaf("campaigns", "Campaigns", v(AdminView::Campaigns)),
        N::group(
            "reports",
            "Reports",
            vec![
                N::leaf("live", "Live report", v(AdminView::LiveReport)),
                N::leaf("history", "Report history", v(AdminView::ReportHistory)),
            ],
        ),
        N::leaf("chat", "Chat", v(AdminView::Chat)),
    ]
}

fn coordinator_nodes() -> Vec<NavigationNode> {
    use NavigationNode as N;
    let v = View::Coordinator;
    vec![
        N::leaf("profile", "Profile", v(CoordinatorView::Profile)),
        N::leaf("campaigns", "Campaigns", v(CoordinatorView::Campaigns)),
        N::leaf("volunteers", "Volunteers", v(CoordinatorView::Volunteers)),
        N::leaf("deliveries", "Deliveries", v(CoordinatorView::Deliveries)),
        N::group(
            "reports",
            "Reports",
            vec![N::leaf("live", "Live report", v(CoordinatorView::LiveReport))],
        ),
        N::leaf("chat", "Chat", v(CoordinatorView::Chat)),
    ]
}

fn donor_nodes() -> Vec<NavigationNode> {
    use NavigationNode as N;
    let v = View::Donor;
    vec![
        N::leaf("profile", "Profile", v(DonorView::Profile)),
        N::leaf("donate", "Donate", v(DonorView::Donate)),
        N::leaf("history", "Donation history", v(DonorView::History)),
        N::leaf("certificates", "Certificates", v(DonorView::Certificates)),
        N::leaf("chat", "Chat", v(DonorView::Chat)),
    ]
}

fn volunteer_nodes() -> Vec<NavigationNode> {
    use NavigationNode as N;
    let v = View::Volunteer;
    vec![
        N::leaf("profile", "Profile", v(VolunteerView::Profile)),
        N::leaf("tasks", "Tasks", v(VolunteerView::Tasks)),
        N::leaf("availability", "Availability", v(VolunteerView::Availability)),
        N::leaf("chat", "Chat", v(VolunteerView::Chat)),
    ]
}

fn beneficiary_nodes() -> Vec<NavigationNode> {
    use NavigationNode as N;
    let v = View::Beneficiary;
    vec![
        N::leaf("profile", "Profile", v(BeneficiaryView::Profile)),
        N::leaf("requests", "Aid requests", v(BeneficiaryView::Requests)),
        N::leaf("deliveries", "Deliveries", v(BeneficiaryView::Deliveries)),
        N::leaf("chat", "Chat", v(BeneficiaryView::Chat)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn every_leaf_maps_to_one_view_of_its_role() {
        for role in Role::ALL {
            let tree = NavigationTree::for_role(role);
            let leaves = tree.leaves();
            let paths: BTreeSet<_> = leaves.iter().map(|(p, _)| p.clone()).collect();
            let views: BTreeSet<_> = leaves.iter().map(|(_, v)| format!("{v:?}")).collect();
            assert_eq!(paths.len(), leaves.len(), "duplicate path for {role}");
            assert_eq!(views.len(), leaves.len(), "view reused for {role}");
            assert!(leaves.iter().all(|(_, v)| v.role() == role));
        }
    }

    #[test]
    fn trees_do_not_overlap() {
        let mut seen = BTreeSet::new();
        for role in Role::ALL {
            for (path, _) in NavigationTree::for_role(role).leaves() {
                assert!(seen.insert(path.clone()), "{path} shared between roles");
            }
        }
    }

    #[test]
    fn default_leaf_is_profile() {
        for role in Role::ALL {
            let (path, view) = NavigationTree::for_role(role).default_leaf();
            assert_eq!(path, format!("{role}/profile"));
            assert_eq!(view, profile_view(role));
        }
    }

    #[test]
    fn resolve_handles_groups_roots_and_foreign_paths() {
        let admin = NavigationTree::for_role(Role::Admin);
        assert_eq!(
            admin.resolve("/admin/users/"),
            Some(("admin/users/donors".into(), View::Admin(AdminView::Donors)))
        );
        assert_eq!(
            admin.resolve("admin/reports/history"),
            Some(("admin/reports/history".into(), View::Admin(AdminView::ReportHistory)))
        );
        assert_eq!(admin.resolve("admin").map(|(p, _)| p), Some("admin/profile".into()));
        assert_eq!(admin.resolve("admin/unknown"), None);
        assert_eq!(admin.resolve("admin/profile/extra"), None);
        assert_eq!(admin.resolve("donor/profile"), None);
        assert_eq!(admin.resolve(""), None);
    }

    #[test]
    fn live_feeds_are_attached_to_chat_and_reports() {
        let coordinator = NavigationTree::for_role(Role::Coordinator);
        let (_, view) = coordinator.resolve("coordinator/reports/live").expect("live");
        assert_eq!(view.live_feed(), Some(LiveFeed::LiveReport));

        let donor = NavigationTree::for_role(Role::Donor);
        let (_, chat) = donor.resolve("donor/chat").expect("chat");
        assert_eq!(chat.live_feed(), Some(LiveFeed::Chat));
        assert_eq!(donor.default_leaf().1.live_feed(), None);
    }
}
