use std::fmt::Display;

use super::super::Trail;


/// Trait to make failing trails on error easier and nicer.
///
/// The most common use is for [`Result`] instances in combination with the `?` operator.
///
/// # Examples
///
/// ```
/// extern crate optrail;
///
/// use std::num::ParseIntError;
///
/// use optrail::Trail;
/// use optrail::utils::FailTrail;
///
/// fn work(trail: &Trail) -> Result<i32, ParseIntError> {
///     let ten: i32 = "10".parse().fail_trail(trail)?;
///     let two: i32 = "2".parse().fail_trail(trail)?;
///     Ok(ten * two)
/// }
///
/// fn main() {
///     let trail = optrail::begin("test");
///     let result = work(&trail).unwrap();
///     trail.succeed();
///     println!("{}", result);
/// }
/// ```
///
/// [`Result`]: https://doc.rust-lang.org/std/result/enum.Result.html
pub trait FailTrail {
    type Error: Display + ?Sized;

    /// Access the current error information, if any.
    ///
    /// Returns [`None`] if there was no error.
    ///
    /// [`None`]: https://doc.rust-lang.org/std/option/enum.Option.html#variant.None
    fn error(&self) -> Option<&Self::Error>;

    /// Fails the trail if there was an error.
    ///
    /// The trail is finalized with `succeeded = false` and the rendered
    /// error, then reported.
    /// Nothing is done if there was no error (`error()` returns [`None`]).
    ///
    /// [`None`]: https://doc.rust-lang.org/std/option/enum.Option.html#variant.None
    fn fail_trail(self, trail: &Trail) -> Self;
}

impl<T, E> FailTrail for Result<T, E> where
    E: Display
{
    type Error = E;

    fn error(&self) -> Option<&E> {
        self.as_ref().err()
    }

    fn fail_trail(self, trail: &Trail) -> Result<T, E> {
        trail.fail_if(self)
    }
}
