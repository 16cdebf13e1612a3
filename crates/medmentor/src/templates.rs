//! Deterministic reply templates.
//!
//! These strings are part of the external contract — tests compare them
//! byte-for-byte, so edits here are breaking changes.

use crate::types::UserProfile;

pub const PROFILE_NOT_FOUND: &str = "⚠️ User profile not found. Please contact support.";

pub const AUTHORIZATION_DENIED: &str = "🔒 You're not authorized to view other students' data";

pub const GENERIC_FAILURE: &str = "⚠️ Our medical team is currently busy. Please try again later.";

/// Performance report embedding all profile performance fields, in fixed order.
pub fn performance_report(profile: &UserProfile) -> String {
    format!(
        "📊 **Performance Report for {}**\n\
         🏥 {} | {}\n\n\
         ⭐ Best Performance: {}\n\
         📅 Simulations This Week: {}\n\
         ✅ Completed: {}/{}\n\
         📈 Average Score: {:.1}/5\n\
         🧠 Areas Needing Improvement: {}\n\
         💡 Feedback: {}\n\n\
         Want personalized training suggestions?",
        profile.name,
        profile.college,
        profile.specialization,
        profile.best_performance,
        profile.surgeries_this_week,
        profile.simulations_completed,
        profile.total_simulations,
        profile.avg_score,
        profile.weak_areas.join(", "),
        profile.feedback,
    )
}

/// Greeting: names the first weak area when one is recorded, otherwise a
/// generic greeting naming the specialization.
pub fn greeting(profile: &UserProfile) -> String {
    match profile.weak_areas.first() {
        Some(area) => format!(
            "👋 Welcome back {}! Ready to work on **{}** today?",
            profile.name, area
        ),
        None => format!(
            "👋 Hello Dr. {}! How can I assist with your {} training today?",
            profile.name, profile.specialization
        ),
    }
}

/// Fixed 4-step training plan for a weak area.
pub fn training_plan(area: &str) -> String {
    format!(
        "🧠 **Focused Training Plan for {}**\n\n\
         1. Review 3D anatomy module (15 min)\n\
         2. Practice in VR simulator (Module 7)\n\
         3. Watch expert video demonstration\n\
         4. Attempt guided simulation with real-time feedback\n\n\
         Start now? [Yes/No]",
        area
    )
}
