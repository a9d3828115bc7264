pub mod detect;
pub mod dispatch;
pub mod keygen;
pub mod reduce;
pub mod sign_run;
pub mod verify_run;
pub mod watch;
