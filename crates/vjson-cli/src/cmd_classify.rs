//! `vjson classify` — the classifier's verdict for a buffer.

use vjson_classify::{Classifier, Status};

use crate::ClassifyArgs;

pub fn run(args: &ClassifyArgs) -> anyhow::Result<()> {
    let input = crate::read_input(args.file.as_ref())?;
    let mut classifier = Classifier::new();
    classifier.advance(&input);
    let completion = classifier.completion();

    match completion.status {
        Status::Complete => println!("status: complete"),
        Status::CompleteEarly { remainder } => {
            println!("status: complete-early");
            println!("remainder-offset: {remainder}");
        }
        Status::Incomplete => {
            println!("status: incomplete");
            println!("trim: {}", completion.trim);
            println!(
                "suffix: {}",
                String::from_utf8_lossy(&completion.suffix)
            );
        }
        Status::Invalid(err) => {
            println!("status: invalid");
            println!("error: {err}");
        }
    }
    Ok(())
}
