// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PP-OCRv5 text recognition model
//!
//! Recognizes the text content of a cropped line with greedy CTC decoding
//! over the PP-OCRv5 Latin dictionary.

use anyhow::{anyhow, Context, Result};
use image::DynamicImage;
use ndarray::{ArrayView2, Axis, Ix2};
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::detection::build_session;
use super::preprocessing::preprocess_for_recognition;

/// CTC blank class
const BLANK_INDEX: usize = 0;

/// Recognized text with confidence score
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedText {
    pub text: String,
    /// Mean probability of the decoded characters (0.0-1.0)
    pub confidence: f32,
}

impl RecognizedText {
    pub fn new(text: String, confidence: f32) -> Self {
        Self { text, confidence }
    }

    /// Check if the text is empty or whitespace only
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Character table for CTC decoding
///
/// Class 0 is the blank, classes `1..=n` are the dictionary lines in order,
/// and one extra space class follows them.
#[derive(Debug, Clone)]
pub struct CharacterDictionary {
    classes: Vec<String>,
}

impl CharacterDictionary {
    /// Build from the contents of a dictionary file (one entry per line)
    pub fn parse(contents: &str) -> Self {
        let mut classes = vec![String::new()];
        classes.extend(
            contents
                .lines()
                .map(|line| line.trim_end_matches('\r').to_string()),
        );
        classes.push(" ".to_string());
        Self { classes }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .context(format!("Failed to open dictionary: {}", path.display()))?;
        Ok(Self::parse(&contents))
    }

    /// Number of output classes, blank included
    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        if index == BLANK_INDEX {
            return None;
        }
        self.classes.get(index).map(String::as_str)
    }
}

/// CTC greedy decoding over a `[timesteps, classes]` probability matrix
///
/// Takes the argmax per timestep, collapses repeats, drops blanks and maps
/// the rest through `dictionary`. Indices outside the dictionary are skipped.
pub fn ctc_greedy_decode(
    probabilities: ArrayView2<f32>,
    dictionary: &CharacterDictionary,
) -> RecognizedText {
    let mut text = String::new();
    let mut scores = Vec::new();
    let mut previous: Option<usize> = None;

    for step in probabilities.axis_iter(Axis(0)) {
        let (index, prob) = step
            .iter()
            .copied()
            .enumerate()
            .fold((BLANK_INDEX, f32::NEG_INFINITY), |best, (i, p)| {
                if p > best.1 {
                    (i, p)
                } else {
                    best
                }
            });

        if previous != Some(index) {
            if let Some(ch) = dictionary.get(index) {
                text.push_str(ch);
                scores.push(prob);
            }
        }
        previous = Some(index);
    }

    let confidence = if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f32>() / scores.len() as f32
    };

    RecognizedText::new(text, confidence)
}

/// PP-OCRv5 text recognition model
///
/// Runs on CPU only.
#[derive(Clone)]
pub struct OcrRecognitionModel {
    session: Arc<Mutex<Session>>,
    dictionary: Arc<CharacterDictionary>,
    input_name: String,
}

impl std::fmt::Debug for OcrRecognitionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrRecognitionModel")
            .field("num_classes", &self.dictionary.num_classes())
            .field("input_name", &self.input_name)
            .finish_non_exhaustive()
    }
}

impl OcrRecognitionModel {
    /// Load the recognizer and its character dictionary (blocking)
    pub fn new<P: AsRef<Path>, D: AsRef<Path>>(model_path: P, dict_path: D) -> Result<Self> {
        let model_path = model_path.as_ref();
        let dict_path = dict_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("OCR recognition model not found: {}", model_path.display());
        }
        if !dict_path.exists() {
            anyhow::bail!(
                "OCR character dictionary not found: {}",
                dict_path.display()
            );
        }

        info!(
            "Loading OCR recognition model from {}",
            model_path.display()
        );

        let dictionary = CharacterDictionary::load(dict_path)?;
        info!(
            "Loaded character dictionary with {} classes",
            dictionary.num_classes()
        );

        let session = build_session(model_path).context(format!(
            "Failed to load OCR recognition model from {}",
            model_path.display()
        ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "x".to_string());

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            dictionary: Arc::new(dictionary),
            input_name,
        })
    }

    pub fn num_classes(&self) -> usize {
        self.dictionary.num_classes()
    }

    /// Recognize the text of one cropped line
    pub fn recognize(&self, crop: &DynamicImage) -> Result<RecognizedText> {
        let input = preprocess_for_recognition(crop);

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("Recognition session lock poisoned"))?;

        let input_value = Value::from_array(input).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Recognition inference failed")?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        // [1, T, C] -> [T, C]
        let shape = output_tensor.shape().to_vec();
        debug!("Recognition output shape: {:?}", shape);
        let probabilities = match shape.len() {
            3 => output_tensor.index_axis(Axis(0), 0).into_dimensionality::<Ix2>(),
            2 => output_tensor.view().into_dimensionality::<Ix2>(),
            _ => anyhow::bail!("Unexpected recognition output shape: {:?}", shape),
        }
        .context("Recognition output has unexpected rank")?;

        Ok(ctc_greedy_decode(probabilities, &self.dictionary))
    }
}
