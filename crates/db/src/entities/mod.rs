//! `SeaORM` entity definitions.

pub mod dealers;
pub mod surveys;

pub mod prelude {
    //! Entity re-exports.
    pub use super::dealers::Entity as Dealers;
    pub use super::surveys::Entity as Surveys;
}
