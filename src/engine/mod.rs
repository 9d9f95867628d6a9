pub mod assignment;
pub mod earnings;
pub mod lifecycle;
pub mod otp;
pub mod vendors;
