use rocket::Route;

mod live;
mod organizer;
mod public;
mod voter;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(organizer::routes());
    routes.extend(live::routes());
    routes.extend(public::routes());
    routes.extend(voter::routes());
    routes
}
