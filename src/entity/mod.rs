pub mod booking_locks;
pub mod bookings;
pub mod holidays;
pub mod merchants;
pub mod service_options;
pub mod services;
pub mod staff;
pub mod staff_skills;
pub mod working_hours;

pub use booking_locks::Entity as BookingLocks;
pub use bookings::Entity as Bookings;
pub use holidays::Entity as Holidays;
pub use merchants::Entity as Merchants;
pub use service_options::Entity as ServiceOptions;
pub use services::Entity as Services;
pub use staff::Entity as Staff;
pub use staff_skills::Entity as StaffSkills;
pub use working_hours::Entity as WorkingHours;
