pub mod lda;
pub mod semi_supervised;

pub use lda::fit_weights;
pub use semi_supervised::{
    count_identified,
    Classifier,
    LearningParams,
    PeptideScores,
    SemiSupervisedLearner,
};
