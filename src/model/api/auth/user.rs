use crate::model::common::user::Role;

/// A kind of caller a route can demand, marked by the role it requires.
pub trait User {
    /// The role a token must satisfy to act as this user type.
    const ROLE: Role;
}

/// Any signed-in user. Organizers can vote too.
#[derive(Debug)]
pub struct Voter;

/// A user allowed to create and manage elections.
#[derive(Debug)]
pub struct Organizer;

impl User for Voter {
    const ROLE: Role = Role::Voter;
}

impl User for Organizer {
    const ROLE: Role = Role::Organizer;
}
