//! Roles and the capabilities they grant.
//!
//! The backend reports a user's roles as one comma-separated string
//! ("ADMIN,PATIENT"). It is parsed once into a [`RoleSet`] and all
//! visibility decisions go through [`RoleSet::can`].

use crate::UserDto;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Doctor,
    Patient,
    User,
}

impl Role {
    pub fn name(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Doctor => "DOCTOR",
            Role::Patient => "PATIENT",
            Role::User => "USER",
        }
    }

    /// Match a role name, accepting a `ROLE_` prefix and any case
    pub fn from_name(name: &str) -> Option<Role> {
        let name = name.trim();
        let name = name
            .get(..5)
            .filter(|prefix| prefix.eq_ignore_ascii_case("ROLE_"))
            .map_or(name, |_| &name[5..]);

        [Role::Admin, Role::Doctor, Role::Patient, Role::User]
            .into_iter()
            .find(|role| role.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Something a user may be allowed to do in the client
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    /// Browse and search the medicine catalog
    ViewMedicines,
    /// Add a medicine to the catalog
    AddMedicine,
    /// Edit or delete catalog entries
    ManageMedicines,
    /// View and create one's own prescriptions
    ViewPrescriptions,
    /// The admin user-management panel
    ManageUsers,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Capability::ViewMedicines => "view medicines",
            Capability::AddMedicine => "add medicines",
            Capability::ManageMedicines => "edit or delete medicines",
            Capability::ViewPrescriptions => "manage prescriptions",
            Capability::ManageUsers => "manage users",
        };
        f.write_str(label)
    }
}

/// The roles held by one user
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    /// Parse a comma-separated role list. Unknown names are skipped.
    pub fn parse(roles: &str) -> Self {
        let mut set = BTreeSet::new();
        for name in roles.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            match Role::from_name(name) {
                Some(role) => {
                    set.insert(role);
                }
                None => tracing::debug!("Ignoring unknown role name {:?}", name),
            }
        }
        Self(set)
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }

    pub fn can(&self, capability: Capability) -> bool {
        match capability {
            Capability::ViewMedicines => !self.is_empty(),
            Capability::AddMedicine => self.contains(Role::Admin) || self.contains(Role::Doctor),
            Capability::ManageMedicines | Capability::ManageUsers => self.contains(Role::Admin),
            Capability::ViewPrescriptions => self.contains(Role::Patient),
        }
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(Role::name).collect();
        f.write_str(&names.join(","))
    }
}

impl UserDto {
    pub fn roles(&self) -> RoleSet {
        RoleSet::parse(&self.role)
    }
}
