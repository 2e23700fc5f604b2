//! fieldmap - sign-in and photo session storage for lab documentation
//!
//! Google OAuth with stateless signed state tokens, a token store that
//! refreshes on expiry, and a session/photo store whose manifest and images
//! are synced to Google Drive (or a local folder).

mod config;
mod coordination;
mod oauth2;
mod photos;
mod state_token;
mod storage;
mod utils;


pub use config::DeploymentMode;

pub use coordination::{AppContext, AuthStatus, CoordinationError};

pub use oauth2::{
    AuthFlowState, CallbackParams, ClientCredentials, GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL,
    GOOGLE_USERINFO_URL, GoogleOAuth2Provider, OAuth2Config, OAuth2Coordinator, OAuth2Error,
    OAuth2Provider, OAuthToken, SESSION_EXPIRED_MESSAGE, TokenResponse, TokenStore,
};

pub use photos::{
    AnnotationOutcome, DEFAULT_SESSION, ExportRow, Photo, PhotoContent, PhotoError, PhotoImages,
    PhotoStore, PhotoVariant, TIMESTAMP_FORMAT,
};

pub use state_token::{
    DEFAULT_STATE_MAX_AGE, StatePayload, StateTokenCodec, StateTokenConfig, StateTokenError,
};

pub use storage::{
    DriveConfig, GoogleDriveStorage, InMemoryPhotoStorage, LocalFolderStorage, MANIFEST_VERSION,
    ManifestIndex, PhotoMeta, PhotoStorage, StorageError, StorageKind, StoredBlob, THUMBNAIL_SIZE,
    decode_image, encode_png, make_thumbnail,
};

pub use utils::{UtilError, gen_random_string};
