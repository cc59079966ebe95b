/*!

This is the long-form manual for `report_filling` and `crgen`.

## Inputs

`crgen` takes three files:
* a roster of participants, in Excel (`.xlsx`) or CSV format
* a report template, in Word (`.docx`) format
* a configuration file in JSON (optional: a built-in configuration for training
  reports is used otherwise)

### Roster

The first row holds the column names. The following columns are required (their
names can be changed in the configuration):

| session | Prénom | Nom    | formation | nb d'heure | formateur |
|---------|--------|--------|-----------|------------|-----------|
| S1      | Ana    | Durand | Excel     | 7          | Martin    |
| S1      | Bob    | Petit  | Excel     | 7          | Martin    |
| S2      | Chloé  | Roux   | Word      | 3          | Leroy     |

Column names are compared without surrounding spaces and without regard to
case. Other columns are ignored. Rows sharing a session id form a session; the
course, duration and trainer of a session are read from its first row.

If a required column is missing, or if a row leaves a required cell empty,
nothing is generated.

### Template

The template is a regular document containing:
- placeholders, replaced by the session values: `{{formateur}}`,
  `{{ref_session}}`, `{{formation_dispensee}}`, `{{duree_formation}}`,
  `{{nb_participants}}` (and `{{prenom}}`, `{{nom}}` for questionnaires)
- checkbox markers `{{checkbox}}`, written next to each option of the
  feedback questions

```text
Satisfaction globale du groupe :
{{checkbox}} Très satisfait   {{checkbox}} Satisfait   {{checkbox}} Insatisfait

Avez-vous adapté le déroulé ?  {{checkbox}} Oui  {{checkbox}} Non
```

The option text can come after its marker (as above) or before it
(`Oui {{checkbox}} Non {{checkbox}}`), but all the options of a paragraph must
follow the same convention. Paragraphs inside tables are processed like the
others.

A placeholder or a marker is only recognized if it is written with a single
formatting: a token half in bold is left as is in the output, and reported.

## Answer groups

Each question of the form is an answer group:

```json
{
  "name": "suivi",
  "options": ["Oui", "Non", "Non concerné"],
  "positive": [],
  "anchors": ["fichier de suivi"],
  "hardOverride": "Non concerné"
}
```

- `options`: the labels, as written in the template. When several labels
  match next to a marker, the longest wins (`Non concerné` rather than `Non`).
- `positive`: the labels preferred when the answer is drawn at random.
- `anchors`: phrases of the template that introduce the question. They are only
  needed when several questions share labels (`Oui`/`Non`, or the motivation
  and assiduity scales). Without anchors, shared labels are attributed to the
  questions in the order of the configuration.
- `hardOverride`: an answer that is always selected, whatever the operator
  asked for.

For every question found in a document, the answer is:
1. the hard override of the group, if any
2. otherwise the answer fixed by the operator, if any
3. otherwise drawn at random among the positive options present in the
   document, or among all the options present if none is positive.

An answer that does not appear in the document leaves the question unticked,
and is reported.

## Operator choices

The `operator` section holds the choices of the person generating the reports:

```json
"operator": {
  "fixed": { "satisfaction": "Satisfait" },
  "improvementNotes": "Prévoir plus d'exercices pratiques",
  "observations": "",
  "sessions": {
    "S2": { "fixed": { "satisfaction": "Très satisfait" }, "observations": "Salle trop petite" }
  }
}
```

Choices under `sessions` refine the default ones for one session. Non-empty
notes and observations are appended at the end of the report, under the
headings of the `freeText` section.

## Questionnaires

With `"variant": "participantQuiz"`, one document is generated per participant
instead of one per session. The template is a multiple-choice questionnaire:

```text
1. Quelle est la capitale de la France ?
{{checkbox}} A) Lyon
{{checkbox}} B) Paris {{correct}}
{{checkbox}} C) Marseille
```

The answers of every question are shuffled for each participant, and the
marker of the correct answer is ticked. `quiz.fixedPositions` pins the correct
answer of some questions to a letter: `{ "1": "B" }` always puts the correct
answer of the first question under `B)`.

## Outputs

All the documents are written into one archive (`Comptes_Rendus.zip` by
default), named `Compte_Rendu_<session>.docx` or
`QCM_<session>_<Nom>_<Prénom>.docx`. The archive also holds a summary
spreadsheet (`Recapitulatif.xlsx`) with one line per session: the session, its
trainer, its number of participants and the answer of the `headlineGroup`.

If a document cannot be written, the others are still archived and the program
exits with an error listing the failed documents.

 */
