mod common;
mod onboarding;
