// Site content: one back-office manager per table plus the public read side.
// Managers share the generic handlers in `handlers`; per-table validation and
// SQL live with each `Resource` impl.

pub mod academics;
pub mod contact;
pub mod contact_page;
pub mod events;
pub mod handlers;
pub mod home;
pub mod news;
pub mod people;
pub mod resource;
pub mod site;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::content::resource::Resource;
use crate::state::AppState;

/// Mounts list/create, get/patch/delete and (for ordered tables) reorder
/// under `/api/v1/admin/{segment}`.
pub fn admin_crud<R: Resource>(router: Router<AppState>, segment: &str) -> Router<AppState> {
    let base = format!("/api/v1/admin/{segment}");
    let router = router
        .route(
            &base,
            get(handlers::handle_list::<R>).post(handlers::handle_create::<R>),
        )
        .route(
            &format!("{base}/:id"),
            get(handlers::handle_get::<R>)
                .patch(handlers::handle_update::<R>)
                .delete(handlers::handle_delete::<R>),
        );
    if R::ORDERED {
        router.route(
            &format!("{base}/reorder"),
            post(handlers::handle_reorder::<R>),
        )
    } else {
        router
    }
}

/// Like `admin_crud` without create: for rows that only visitors submit.
pub fn admin_review<R: Resource>(router: Router<AppState>, segment: &str) -> Router<AppState> {
    let base = format!("/api/v1/admin/{segment}");
    router
        .route(&base, get(handlers::handle_list::<R>))
        .route(
            &format!("{base}/:id"),
            get(handlers::handle_get::<R>)
                .patch(handlers::handle_update::<R>)
                .delete(handlers::handle_delete::<R>),
        )
}

/// `GET /api/v1/public/{segment}` listing the visible rows.
pub fn public_list<R: Resource>(router: Router<AppState>, segment: &str) -> Router<AppState> {
    router.route(
        &format!("/api/v1/public/{segment}"),
        get(handlers::handle_public_list::<R>),
    )
}

/// All content routes, admin and public.
pub fn routes() -> Router<AppState> {
    use academics::AcademicPrograms;
    use contact::ContactSubmissions;
    use contact_page::{ContactAddresses, ContactLocations, ContactPageContents};
    use events::{Events, GalleryPhotos};
    use news::{NewsComments, NewsPosts};
    use people::{BoardMembers, LeadershipMessages, Testimonials};
    use site::{BreakingNews, HeroSlides, PageContents, SchoolFeatures, SchoolStats, SocialLinks};

    let mut router = Router::new();

    // Back office
    router = admin_crud::<HeroSlides>(router, "hero-slides");
    router = admin_crud::<BreakingNews>(router, "breaking-news");
    router = admin_crud::<LeadershipMessages>(router, "leadership-messages");
    router = admin_crud::<BoardMembers>(router, "board-members");
    router = admin_crud::<Testimonials>(router, "testimonials");
    router = admin_crud::<SchoolFeatures>(router, "school-features");
    router = admin_crud::<SchoolStats>(router, "school-stats");
    router = admin_crud::<SocialLinks>(router, "social-links");
    router = admin_crud::<AcademicPrograms>(router, "academic-programs");
    router = admin_crud::<GalleryPhotos>(router, "gallery");
    router = admin_crud::<Events>(router, "events");
    router = admin_crud::<NewsPosts>(router, "news");
    router = admin_crud::<PageContents>(router, "page-content");
    router = admin_crud::<ContactAddresses>(router, "contact-addresses");
    router = admin_crud::<ContactLocations>(router, "contact-locations");
    router = admin_crud::<ContactPageContents>(router, "contact-content");
    router = admin_review::<ContactSubmissions>(router, "contact-submissions");
    router = admin_review::<NewsComments>(router, "news-comments");

    // Public site
    router = public_list::<HeroSlides>(router, "hero-slides");
    router = public_list::<BreakingNews>(router, "breaking-news");
    router = public_list::<LeadershipMessages>(router, "leadership-messages");
    router = public_list::<BoardMembers>(router, "board-members");
    router = public_list::<SchoolFeatures>(router, "school-features");
    router = public_list::<SchoolStats>(router, "school-stats");
    router = public_list::<SocialLinks>(router, "social-links");
    router = public_list::<AcademicPrograms>(router, "academic-programs");
    router = public_list::<GalleryPhotos>(router, "gallery");
    router = public_list::<NewsPosts>(router, "news");
    router = public_list::<ContactAddresses>(router, "contact-addresses");
    router = public_list::<ContactLocations>(router, "contact-locations");
    router = public_list::<ContactPageContents>(router, "contact-content");

    router
        .route(
            "/api/v1/public/testimonials",
            get(handlers::handle_public_list::<Testimonials>)
                .post(people::handle_submit_testimonial),
        )
        .route("/api/v1/public/events", get(events::handle_public_events))
        .route("/api/v1/public/home", get(home::handle_home))
        .route("/api/v1/public/pages/:page_key", get(home::handle_page))
        .route("/api/v1/public/news/:post", get(news::handle_get_article))
        .route("/api/v1/public/news/:post/like", post(news::handle_like))
        .route(
            "/api/v1/public/news/:post/comments",
            post(news::handle_add_comment),
        )
        .route("/api/v1/public/contact", post(contact::handle_contact))
        .route(
            "/api/v1/public/staff-counts",
            get(site::handle_get_staff_counts),
        )
        .route(
            "/api/v1/admin/staff-counts",
            put(site::handle_put_staff_counts),
        )
}
