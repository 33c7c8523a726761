//! Service container.
//!
//! Wires repositories, storage and the activity broadcaster into the
//! application services and hands them out as trait objects.

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use super::{
    ActivityRecorder, ActivityService, AuthService, Authenticator, DashboardManager,
    DashboardService, GalleryManager, GalleryService, HttpOAuthClient, MenuManager, MenuService,
    OAuthClient, ProductionManager, ProductionService, ProfileManager, ProfileService,
    RbacManager, RbacService, SettingsManager, SettingsService, SocialAuthService,
    SocialAuthenticator, UserManager, UserService,
};
use crate::config::Config;
use crate::infra::repositories::{
    ActivityStore, GalleryStore, LineStore, MenuStore, OrderStore, RbacStore, ScheduleStore,
    SettingsStore, UserStore,
};
use crate::infra::{ActivityBroadcaster, FileStorage};

/// Every application service behind its trait; cheap to clone.
#[derive(Clone)]
pub struct Services {
    pub auth: Arc<dyn AuthService>,
    pub social: Arc<dyn SocialAuthService>,
    pub users: Arc<dyn UserService>,
    pub rbac: Arc<dyn RbacService>,
    pub production: Arc<dyn ProductionService>,
    pub gallery: Arc<dyn GalleryService>,
    pub menus: Arc<dyn MenuService>,
    pub settings: Arc<dyn SettingsService>,
    pub profile: Arc<dyn ProfileService>,
    pub activity: Arc<dyn ActivityService>,
    pub dashboard: Arc<dyn DashboardService>,
}

impl Services {
    /// Build every service on top of the SeaORM stores.
    pub fn from_parts(
        db: DatabaseConnection,
        storage: Arc<dyn FileStorage>,
        broadcaster: ActivityBroadcaster,
        config: Config,
    ) -> Self {
        let oauth: Arc<dyn OAuthClient> = Arc::new(HttpOAuthClient::new(config.clone()));
        Self::with_oauth_client(db, storage, broadcaster, oauth, config)
    }

    /// Same as [`Services::from_parts`] with a caller-supplied OAuth client.
    pub fn with_oauth_client(
        db: DatabaseConnection,
        storage: Arc<dyn FileStorage>,
        broadcaster: ActivityBroadcaster,
        oauth: Arc<dyn OAuthClient>,
        config: Config,
    ) -> Self {
        let user_repo = Arc::new(UserStore::new(db.clone()));
        let rbac_repo = Arc::new(RbacStore::new(db.clone()));

        let activity: Arc<dyn ActivityService> = Arc::new(ActivityRecorder::new(
            Arc::new(ActivityStore::new(db.clone())),
            broadcaster,
        ));

        let auth: Arc<dyn AuthService> = Arc::new(Authenticator::new(
            user_repo.clone(),
            rbac_repo.clone(),
            activity.clone(),
            config.clone(),
        ));
        let social = Arc::new(SocialAuthenticator::new(
            oauth,
            user_repo.clone(),
            rbac_repo.clone(),
            auth.clone(),
            activity.clone(),
            config.oauth_default_role.clone(),
        ));
        let users: Arc<dyn UserService> = Arc::new(UserManager::new(
            user_repo.clone(),
            rbac_repo.clone(),
            storage.clone(),
            activity.clone(),
        ));
        let rbac = Arc::new(RbacManager::new(rbac_repo, activity.clone()));
        let production: Arc<dyn ProductionService> = Arc::new(ProductionManager::new(
            Arc::new(LineStore::new(db.clone())),
            Arc::new(OrderStore::new(db.clone())),
            Arc::new(ScheduleStore::new(db.clone())),
            activity.clone(),
        ));
        let gallery: Arc<dyn GalleryService> = Arc::new(GalleryManager::new(
            Arc::new(GalleryStore::new(db.clone())),
            storage.clone(),
            activity.clone(),
        ));
        let menus = Arc::new(MenuManager::new(
            Arc::new(MenuStore::new(db.clone())),
            activity.clone(),
        ));
        let settings = Arc::new(SettingsManager::new(
            Arc::new(SettingsStore::new(db)),
            activity.clone(),
        ));
        let profile = Arc::new(ProfileManager::new(user_repo, storage, activity.clone()));
        let dashboard = Arc::new(DashboardManager::new(
            users.clone(),
            production.clone(),
            gallery.clone(),
            activity.clone(),
        ));

        Self {
            auth,
            social,
            users,
            rbac,
            production,
            gallery,
            menus,
            settings,
            profile,
            activity,
            dashboard,
        }
    }
}
