pub mod books;
pub mod feedback;
pub mod highlights;

pub use books::BookRepository;
pub use feedback::FeedbackRepository;
pub use highlights::HighlightRepository;
